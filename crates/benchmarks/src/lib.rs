//! Benchmark utilities for the Conduit substrate components
pub mod utils {
    use tokio::runtime::Runtime;

    /// Single-threaded runtime matching how the bus dispatches: sequentially.
    pub fn runtime() -> Runtime {
        match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(rt) => rt,
            Err(e) => panic!("failed to build benchmark runtime: {e}"),
        }
    }

    /// Deterministic text of `len` bytes, distinct per `seed`.
    pub fn text(seed: u64, len: usize) -> String {
        let mut out = format!("{seed:016x} ");
        while out.len() < len {
            out.push_str("lorem ipsum ");
        }
        out.truncate(len);
        out
    }
}
