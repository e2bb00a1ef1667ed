fn main() {
    println!("cargo:rerun-if-env-changed=ILIDAR_LIB_DIR");

    if std::env::var_os("CARGO_FEATURE_NATIVE").is_none() {
        return;
    }

    match std::env::var("ILIDAR_LIB_DIR") {
        Ok(dir) if !dir.trim().is_empty() => {
            println!("cargo:rustc-link-search=native={}", dir.trim());
        }
        _ => {
            println!("cargo:warning=ILIDAR_LIB_DIR not set, relying on the system linker path for libilidar");
        }
    }
}
