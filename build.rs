use std::process::Command;

fn main() {
    let git_hash = run(&["git", "rev-parse", "--short", "HEAD"]);
    println!("cargo:rustc-env=POLLGATE_GIT_HASH={}", git_hash);

    // YYYY-MM-DD, without pulling chrono into the build script
    let build_date = run(&["date", "+%Y-%m-%d"]);
    println!("cargo:rustc-env=POLLGATE_BUILD_DATE={}", build_date);

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");
}

fn run(argv: &[&str]) -> String {
    Command::new(argv[0])
        .args(&argv[1..])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
