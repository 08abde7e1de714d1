use std::process::Command;

/// Ask the interpreter PyO3 builds against for a sysconfig variable.
fn python_config_var(name: &str) -> Option<String> {
    let python = std::env::var("PYO3_PYTHON").unwrap_or_else(|_| "python3".to_string());
    let output = Command::new(python)
        .args([
            "-c",
            &format!("import sysconfig; print(sysconfig.get_config_var('{name}'))"),
        ])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!value.is_empty() && value != "None").then_some(value)
}

fn main() {
    println!("cargo:rerun-if-env-changed=PYO3_PYTHON");

    // The wheel leaves libpython unresolved; the rlib test binaries link it,
    // so point the linker at the interpreter's LIBDIR.
    if std::env::var_os("CARGO_FEATURE_EXTENSION_MODULE").is_some() {
        return;
    }
    if let Some(libdir) = python_config_var("LIBDIR") {
        println!("cargo:rustc-link-search=native={libdir}");
    }
}
