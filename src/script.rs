//! Client tracking script
//!
//! Builds the JavaScript snippet that pages embed to report visits, plus the
//! server-side twin of its ignore-path rule so both sides agree on which paths
//! are tracked.

use regex::Regex;

/// Default endpoint the script reports to
pub const DEFAULT_ENDPOINT: &str = "/api/visit";

/// Script body. Placeholders are substituted by [`generate_client_script`].
const CLIENT_SCRIPT_TEMPLATE: &str = r#"(function() {
  if (%%DISABLE_IN_DEV%% && (window.__SITEVISITS_DEV__ === true || location.hostname === 'localhost')) {
    console.debug('[sitevisits] Tracking disabled in development mode');
    return;
  }

  function shouldIgnorePath(pathname, ignorePaths) {
    return ignorePaths.some(function(pattern) {
      if (pattern === pathname) {
        return true;
      }
      if (pattern.indexOf('*') !== -1) {
        var escaped = pattern.replace(/[.+?^${}()|[\]\\\/]/g, '\\$&').replace(/\*/g, '.*');
        return new RegExp('^' + escaped + '$').test(pathname);
      }
      return false;
    });
  }

  var ignorePaths = %%IGNORE_PATHS%%;
  var currentPath = window.location.pathname;

  if (shouldIgnorePath(currentPath, ignorePaths)) {
    console.debug('[sitevisits] Path ignored: ' + currentPath);
    return;
  }

  var visitData = {
    timestamp: new Date().toISOString(),
    url: window.location.href,
    referrer: document.referrer,
    userAgent: navigator.userAgent,
    language: navigator.language,
    cookies: document.cookie,
    screenWidth: screen.width,
    screenHeight: screen.height,
    colorDepth: screen.colorDepth,
    timezone: Intl.DateTimeFormat().resolvedOptions().timeZone
  };

  fetch(%%ENDPOINT%%, {
    method: 'POST',
    headers: { 'Content-Type': 'application/json' },
    body: JSON.stringify(visitData)
  }).catch(function(err) {
    console.error('[sitevisits] Failed to send visit data:', err);
  });
})();"#;

/// Render the tracking script
///
/// `ignore_paths` and `endpoint` are embedded as JSON literals, so arbitrary
/// strings cannot break out of the script.
pub fn generate_client_script(ignore_paths: &[String], endpoint: &str, disable_in_dev: bool) -> String {
    let ignore_json = serde_json::to_string(ignore_paths).unwrap_or_else(|_| "[]".to_string());
    let endpoint_json =
        serde_json::to_string(endpoint).unwrap_or_else(|_| format!("\"{}\"", DEFAULT_ENDPOINT));

    CLIENT_SCRIPT_TEMPLATE
        .replace("%%DISABLE_IN_DEV%%", if disable_in_dev { "true" } else { "false" })
        .replace("%%IGNORE_PATHS%%", &ignore_json)
        .replace("%%ENDPOINT%%", &endpoint_json)
}

/// Wrap the tracking script in an inline `<script>` element
pub fn script_tag(ignore_paths: &[String], endpoint: &str, disable_in_dev: bool) -> String {
    let script = generate_client_script(ignore_paths, endpoint, disable_in_dev);
    // "</" inside the body would close the element early
    format!("<script>\n{}\n</script>", script.replace("</", "<\\/"))
}

/// Whether `pathname` matches any ignore pattern
///
/// A pattern matches on exact equality, or, when it contains `*`, as an
/// anchored wildcard where `*` spans any run of characters (including `/`).
pub fn should_ignore_path(pathname: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|pattern| {
        if pattern == pathname {
            return true;
        }
        if !pattern.contains('*') {
            return false;
        }
        let source = format!(
            "^{}$",
            pattern
                .split('*')
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(".*")
        );
        Regex::new(&source).is_ok_and(|re| re.is_match(pathname))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(p: &[&str]) -> Vec<String> {
        p.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_exact_match() {
        let patterns = paths(&["/admin"]);
        assert!(should_ignore_path("/admin", &patterns));
        assert!(!should_ignore_path("/admin/users", &patterns));
    }

    #[test]
    fn test_wildcard_match() {
        let patterns = paths(&["/api/*"]);
        assert!(should_ignore_path("/api/visit", &patterns));
        assert!(should_ignore_path("/api/visits/stats", &patterns));
        assert!(!should_ignore_path("/apix", &patterns));
        assert!(!should_ignore_path("/blog/api/x", &patterns));
    }

    #[test]
    fn test_wildcard_escapes_regex_metacharacters() {
        let patterns = paths(&["/v1.0/*"]);
        assert!(should_ignore_path("/v1.0/docs", &patterns));
        assert!(!should_ignore_path("/v100/docs", &patterns));
    }

    #[test]
    fn test_no_patterns() {
        assert!(!should_ignore_path("/", &[]));
    }

    #[test]
    fn test_script_embeds_config() {
        let script = generate_client_script(&paths(&["/admin", "/api/*"]), "/track", false);
        assert!(script.contains(r#"["/admin","/api/*"]"#));
        assert!(script.contains(r#"fetch("/track""#));
        assert!(script.contains("if (false &&"));
        assert!(!script.contains("%%"));
    }

    #[test]
    fn test_script_dev_guard() {
        let script = generate_client_script(&[], DEFAULT_ENDPOINT, true);
        assert!(script.contains("if (true &&"));
        assert!(script.contains("var ignorePaths = [];"));
    }

    #[test]
    fn test_script_tag_cannot_be_closed_early() {
        let tag = script_tag(&paths(&["</script><b>"]), DEFAULT_ENDPOINT, false);
        assert!(tag.starts_with("<script>\n"));
        assert!(tag.ends_with("\n</script>"));
        assert_eq!(tag.matches("</script>").count(), 1);
    }
}
