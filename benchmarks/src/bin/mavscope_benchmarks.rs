#[cfg(feature = "analyzer")]
use mavscope_benchmarks::analyzer::benchmark_shared_analyzer;
#[cfg(feature = "framing")]
use mavscope_benchmarks::framing::benchmark_frame_decoding;

fn main() {
    // Setup logger
    env_logger::builder()
        .filter_level(log::LevelFilter::Info) // Suppress everything below `info` for third-party modules.
        .filter_module(env!("CARGO_PKG_NAME"), log::LevelFilter::Trace) // Allow everything from current package
        .init();

    #[cfg(feature = "framing")]
    {
        log::info!("[benchmark_frame_decoding]");
        benchmark_frame_decoding(100_000, 4096);
        benchmark_frame_decoding(10_000, 1);
    }

    #[cfg(feature = "analyzer")]
    {
        log::info!("[benchmark_shared_analyzer]");
        benchmark_shared_analyzer(16, 100_000);
    }
}
