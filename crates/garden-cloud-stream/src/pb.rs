//! Checked-in protobuf/gRPC stubs for the event ingestion service.

#![allow(clippy::all)]

pub mod garden {
    pub mod public {
        pub mod events {
            pub mod v1 {
                include!("generated/garden.public.events.v1.rs");
            }
        }
    }
}

pub use garden::public::events::v1;
