use vergen::EmitBuilder;

// Feeds VERGEN_BUILD_TIMESTAMP and VERGEN_GIT_SHA to the /api/version endpoint.
fn main() {
    if let Err(e) = EmitBuilder::builder()
        .build_timestamp()
        .git_sha(true)
        .emit()
    {
        println!("cargo:warning=version metadata unavailable: {e}");
    }
}
