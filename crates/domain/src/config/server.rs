use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Unix domain socket the DNS server writes dnstap data to
    #[serde(default = "default_socket_path")]
    pub socket_path: String,

    /// Maximum number of bytes read from the socket in one call
    #[serde(default = "default_recv_size")]
    pub recv_size: usize,

    /// Largest data frame accepted before the connection is dropped
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: u32,

    /// Unlink a leftover socket file before binding
    #[serde(default = "default_true")]
    pub remove_stale_socket: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            recv_size: default_recv_size(),
            max_frame_size: default_max_frame_size(),
            remove_stale_socket: true,
        }
    }
}

fn default_socket_path() -> String {
    "/tmp/dnstap".to_string()
}

fn default_recv_size() -> usize {
    65_536
}

fn default_max_frame_size() -> u32 {
    1024 * 1024
}

fn default_true() -> bool {
    true
}
