use proptest::prelude::*;
use vessel_build::Route;
use vessel_build::routes::{IMMUTABLE_CACHE_CONTROL, synthesize};

#[test]
fn static_files_get_their_own_cache_rule() {
    let routes = synthesize("_nuxt/", ["favicon.ico", "robots.txt"], "index");

    assert_eq!(routes[0], Route::cached("/_nuxt/.+"));
    assert_eq!(routes[1], Route::cached(r"/favicon\.ico"));
    assert_eq!(routes[2], Route::cached(r"/robots\.txt"));
    assert_eq!(routes[3], Route::filesystem());
    assert_eq!(routes[4], Route::catch_all("index"));
}

#[test]
fn static_file_patterns_match_literally() {
    let routes = synthesize("_nuxt/", ["img/logo+dark (1).png"], "index");

    let Route::Headers { src, .. } = &routes[1] else {
        panic!("expected a cache rule, got {:?}", routes[1]);
    };
    assert_eq!(src, r"/img/logo\+dark \(1\)\.png");
    let pattern = regex::Regex::new(&format!("^{src}$")).unwrap();
    assert!(pattern.is_match("/img/logo+dark (1).png"));
    assert!(!pattern.is_match("/img/logoodark (1)xpng"));
}

#[test]
fn custom_public_path_and_function() {
    let routes = synthesize("assets/", [], "api");
    let json = serde_json::to_value(&routes).unwrap();

    assert_eq!(json[0]["src"], "/assets/.+");
    assert_eq!(json[0]["headers"]["cache-control"], IMMUTABLE_CACHE_CONTROL);
    assert_eq!(json[2]["dest"], "/api");
}

proptest! {
    #[test]
    fn filesystem_precedes_catch_all(
        public_path in "[a-z_]{1,8}/",
        static_files in prop::collection::btree_set("[a-z]{1,8}\\.(ico|txt|png)", 0..10),
        function in "[a-z]{1,10}",
    ) {
        let routes = synthesize(&public_path, static_files.iter().map(String::as_str), &function);

        let filesystem = routes.iter().position(Route::is_filesystem).unwrap();
        let catch_all = routes.iter().position(Route::is_catch_all).unwrap();
        prop_assert!(filesystem < catch_all);
        prop_assert_eq!(catch_all, routes.len() - 1);
        prop_assert_eq!(routes.len(), static_files.len() + 3);
        for route in &routes[..filesystem] {
            let is_cache_rule = matches!(route, Route::Headers { .. });
            prop_assert!(is_cache_rule);
        }
    }
}
