fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Use the vendored protoc so builds do not depend on a system install.
    let protoc = protoc_bin_vendored::protoc_bin_path()?;
    std::env::set_var("PROTOC", protoc);

    let files = [
        "proto/app/log/command/config.proto",
        "proto/app/proxyman/command/command.proto",
        "proto/app/stats/command/command.proto",
        "proto/common/protocol/headers.proto",
        "proto/common/protocol/user.proto",
        "proto/common/serial/typed_message.proto",
        "proto/core/config.proto",
        "proto/proxy/vmess/account.proto",
    ];

    tonic_prost_build::configure()
        .build_client(true)
        .build_server(true)
        .compile_protos(&files, &["proto"])?;

    for file in &files {
        println!("cargo:rerun-if-changed={file}");
    }
    println!("cargo:rerun-if-changed=proto");

    Ok(())
}
