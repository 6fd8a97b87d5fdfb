use std::io;

use fuserank_service::RerankServer;

fn main() -> io::Result<()> {
    let server = RerankServer::from_env()
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err.to_string()))?;
    let mode = std::env::var("FUSERANK_TRANSPORT").unwrap_or_else(|_| "stdio".to_string());
    match mode.as_str() {
        "stdio" => server.serve_stdio(),
        "http" => {
            let addr = std::env::var("FUSERANK_HTTP_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:8788".to_string());
            server.serve_http(&addr)
        }
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "FUSERANK_TRANSPORT must be stdio or http",
        )),
    }
}
