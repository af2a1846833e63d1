fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Compile the proto with the pure-Rust `protox` parser so the build does
    // not require a `protoc` binary on the host, then hand the resulting
    // descriptor set to tonic-build for code generation.
    let fds = protox::compile(
        ["proto/fnscript/v1/run_function.proto"],
        ["proto"],
    )?;
    tonic_build::compile_fds(fds)?;
    Ok(())
}
