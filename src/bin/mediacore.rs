// 使用 mimalloc 作为全局内存分配器
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() {
    if let Err(e) = mediacore::run().await {
        eprintln!("mediacore failed to start: {e}");
        std::process::exit(1);
    }
}
