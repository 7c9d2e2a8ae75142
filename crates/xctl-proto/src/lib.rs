//! Generated gRPC protocol definitions for the Xray-core administrative API.
//!
//! Package names mirror the upstream service (`xray.app.stats.command` and
//! friends), so the generated stubs are wire-compatible with a running
//! server. The [`serial`] module carries the typed-message envelope helpers
//! used to nest protocol payloads inside handler mutations.

pub mod xray {
    pub mod app {
        pub mod log {
            pub mod command {
                include!(concat!(env!("OUT_DIR"), "/xray.app.log.command.rs"));
            }
        }
        pub mod proxyman {
            pub mod command {
                include!(concat!(env!("OUT_DIR"), "/xray.app.proxyman.command.rs"));
            }
        }
        pub mod stats {
            pub mod command {
                include!(concat!(env!("OUT_DIR"), "/xray.app.stats.command.rs"));
            }
        }
    }
    pub mod common {
        pub mod protocol {
            include!(concat!(env!("OUT_DIR"), "/xray.common.protocol.rs"));
        }
        pub mod serial {
            include!(concat!(env!("OUT_DIR"), "/xray.common.serial.rs"));
        }
    }
    pub mod core {
        include!(concat!(env!("OUT_DIR"), "/xray.core.rs"));
    }
    pub mod proxy {
        pub mod vmess {
            include!(concat!(env!("OUT_DIR"), "/xray.proxy.vmess.rs"));
        }
    }
}

pub mod serial;
