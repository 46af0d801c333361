use std::io::Write;

use unplug_core::config::UnplugConfig;

use super::open_cache;

pub fn run(config: &UnplugConfig, out: &mut dyn Write) -> anyhow::Result<()> {
    let cache = open_cache(config)?;
    let rules = cache.rules()?;

    if rules.is_empty() {
        writeln!(out, "No rules in {}", cache.rewrite_file_path().display())?;
        return Ok(());
    }
    for rule in rules {
        writeln!(out, "{}", rule)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{output, site};
    use unplug_core::cache::hash_hex;
    use unplug_core::http::StatusCode;
    use unplug_core::HttpResponse;

    #[test]
    fn test_lists_rules_in_order() {
        let (_root, config) = site("");
        let cache = open_cache(&config).unwrap();
        cache.add("/about", &HttpResponse::ok("about")).unwrap();
        cache.add_redirect("/old", "/new/", StatusCode::MovedPermanently).unwrap();

        let mut out = Vec::new();
        run(&config, &mut out).unwrap();

        let expected = format!(
            "RewriteRule ^about/?$ ./_unplug_cache/{}.html [L]\nRewriteRule ^old/?$ /new/ [R=301]\n",
            hash_hex("about")
        );
        assert_eq!(output(out), expected);
    }

    #[test]
    fn test_no_rules() {
        let (_root, config) = site("");

        let mut out = Vec::new();
        run(&config, &mut out).unwrap();

        assert!(output(out).starts_with("No rules in "));
    }
}
