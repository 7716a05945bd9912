// Stamps VIGIL_VERSION into the vigilctl binary

fn main() {
    // A release build can pin the reported version through the environment
    let version =
        std::env::var("VIGIL_VERSION").unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());

    println!("cargo:rustc-env=VIGIL_VERSION={}", version);

    println!("cargo:rerun-if-changed=Cargo.toml");
    println!("cargo:rerun-if-env-changed=VIGIL_VERSION");
}
