use std::env;
use std::fs;
use std::path::Path;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=Cargo.toml");

    let name = env::var("CARGO_PKG_NAME").unwrap_or_else(|_| "world-drive-backup".to_string());
    let version = env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".to_string());
    let build_time = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

    let out_dir = env::var("OUT_DIR").expect("OUT_DIR is set by cargo");
    let dest = Path::new(&out_dir).join("build_info.rs");

    let contents = format!(
        "pub const PROJECT_NAME: &str = {name:?};\n\
         pub const PROJECT_VERSION: &str = {version:?};\n\
         pub const BUILD_TIME: &str = {build_time:?};\n"
    );

    fs::write(&dest, contents).expect("failed to write build_info.rs");
}
