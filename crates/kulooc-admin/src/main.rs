#[tokio::main(flavor = "current_thread")]
async fn main() {
    let code = kulooc_admin::run().await;
    std::process::exit(code);
}
