//! Cache persistence and the managed section of the rewrite file

use std::fs;
use std::thread;

use tempfile::TempDir;
use unplug_core::cache::{hash_hex, RewriteConfig};
use unplug_core::prelude::*;

fn cache_in(root: &TempDir, htaccess: &str) -> Cache {
    fs::write(root.path().join(".htaccess"), htaccess).unwrap();
    Cache::new(CacheConfig::new(root.path().join("_unplug_cache"))).unwrap()
}

fn rules_section_len(root: &TempDir) -> usize {
    let text = fs::read_to_string(root.path().join(".htaccess")).unwrap();
    RewriteConfig::parse(&text).rules().len()
}

#[test]
fn add_is_idempotent() {
    let root = TempDir::new().unwrap();
    let cache = cache_in(&root, "");
    let response = HttpResponse::ok("hello");

    cache.add("/x", &response).unwrap();
    let after_first = rules_section_len(&root);
    cache.add("/x", &response).unwrap();

    assert_eq!(after_first, 1);
    assert_eq!(rules_section_len(&root), after_first);
}

#[test]
fn round_trip_with_default_base() {
    let root = TempDir::new().unwrap();
    let cache = cache_in(&root, "");

    cache.add("/x", &HttpResponse::ok("hello")).unwrap();

    let file = cache.dir().join(format!("{}.html", hash_hex("x")));
    assert_eq!(fs::read_to_string(file).unwrap(), "hello");
}

#[test]
fn round_trip_with_base_without_trailing_slash() {
    let root = TempDir::new().unwrap();
    let cache = cache_in(&root, "RewriteBase /sub\n");

    cache.add("/x", &HttpResponse::ok("hello")).unwrap();

    let file = cache.dir().join(format!("{}.html", hash_hex("/x")));
    assert_eq!(fs::read_to_string(file).unwrap(), "hello");
    assert_eq!(
        cache.rules().unwrap(),
        vec![format!("RewriteRule ^/x/?$ ./_unplug_cache/{}.html [L]", hash_hex("/x"))]
    );
}

#[test]
fn flush_preserves_markers_and_surroundings() {
    let root = TempDir::new().unwrap();
    let before = "RewriteCond %{HTTPS} off\nRewriteRule ^ https://%{HTTP_HOST}%{REQUEST_URI} [R=301]\n";
    let cache = cache_in(&root, before);

    for path in ["/a", "/b", "/c"] {
        cache.add(path, &HttpResponse::ok(path)).unwrap();
    }
    let populated = RewriteConfig::parse(&fs::read_to_string(root.path().join(".htaccess")).unwrap());
    assert_eq!(populated.rules().len(), 3);

    assert_eq!(cache.flush().unwrap(), 3);

    let flushed = RewriteConfig::parse(&fs::read_to_string(root.path().join(".htaccess")).unwrap());
    assert!(flushed.rules().is_empty());

    let range = populated.rules_range().unwrap();
    let mut expected: Vec<String> = populated.lines()[..range.start].to_vec();
    expected.extend_from_slice(&populated.lines()[range.end..]);
    assert_eq!(flushed.lines(), expected.as_slice());
    assert!(flushed.render().ends_with(before));
}

#[test]
fn flush_keeps_files_unless_asked() {
    let root = TempDir::new().unwrap();
    let cache = cache_in(&root, "");
    cache.add("/a", &HttpResponse::ok("a")).unwrap();

    cache.flush().unwrap();
    assert!(cache.file_for("a", "html").is_file(), "files stay until swept");
    assert!(cache.lookup("/a").is_none(), "no rule routes to the file any more");

    cache.add("/a", &HttpResponse::ok("a")).unwrap();
    cache.flush_with(FlushPolicy::RulesAndFiles).unwrap();
    assert!(!cache.file_for("a", "html").exists());
    assert!(cache.lookup("/a").is_none());
    assert!(cache.dir().is_dir());
}

#[test]
fn existing_section_is_reused() {
    let root = TempDir::new().unwrap();
    let existing = RewriteConfig::section_template("RewriteBase /").join("\n");
    let text = format!("# operator rules first\n{}", existing);
    let cache = cache_in(&root, &text);

    cache.add("/page", &HttpResponse::ok("page")).unwrap();

    let written = fs::read_to_string(root.path().join(".htaccess")).unwrap();
    assert!(written.starts_with("# operator rules first\n# BEGIN Unplug\n"));
    assert_eq!(written.matches("# BEGIN Unplug rules").count(), 1);
}

#[test]
fn concurrent_writers_do_not_lose_rules() {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join(".htaccess"), "").unwrap();
    let dir = root.path().join("_unplug_cache");

    thread::scope(|scope| {
        for worker in 0..4 {
            let dir = dir.clone();
            scope.spawn(move || {
                let cache = Cache::new(CacheConfig::new(dir)).unwrap();
                for n in 0..10 {
                    cache.add(&format!("/w{}/p{}", worker, n), &HttpResponse::ok("x")).unwrap();
                }
            });
        }
    });

    assert_eq!(rules_section_len(&root), 40);
}

#[test]
fn missing_rewrite_file_is_fatal() {
    let root = TempDir::new().unwrap();
    let config = CacheConfig::new(root.path().join("c")).with_rewrite_file("unplug-it-missing.conf");

    let err = Cache::new(config).unwrap_err();
    assert!(matches!(err, Error::RewriteFileNotFound { .. }));
    assert!(err.to_string().contains("unplug-it-missing.conf"));
}
