//! Host addressing.
//!
//! All hosts share one flat broadcast domain, so a single fixed /24 is
//! enough: host `h<i>` gets `10.0.0.(i+1)/24`.

pub mod allocator;

pub use allocator::{AddressError, HostAddressPlan, HOST_SUBNET};
