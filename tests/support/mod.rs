use reqopt::{Defaults, HeaderMap, Map, Options};

#[allow(unused)]
pub const URL: &str = "http://example.com/";

/// Routes `log` output through `RUST_LOG` for the current test binary.
#[allow(unused)]
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Library defaults merged with `map`, against [`URL`] unless `map` names one.
#[allow(unused)]
pub fn options(map: Map) -> Options {
    init_logger();
    let base = Map::new().with("url", URL);
    Defaults::new()
        .extend(&base)
        .options(&map)
        .unwrap()
}

#[allow(unused)]
pub fn headers(map: Map) -> HeaderMap {
    options(map).normalized_headers().unwrap()
}
