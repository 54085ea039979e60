//! Reference dual core board: 16MB of flash behind an indirect access
//! gateway, 16KB of on-chip scratchpad next to a signature slot, and a
//! secondary core available as a copy engine.
use static_assertions::const_assert;

use crate::{
    config::{Budget, Configuration, FlashLayout},
    drivers::{boot_record::BootRecord, gateway::IndirectGateway, registers::Mmio},
    utilities::memory::Span,
};

#[cfg(feature = "engine-offload")]
use crate::devices::{engine::SharedRing, scratchpad::OffloadScratchpad};
#[cfg(not(feature = "engine-offload"))]
use crate::devices::scratchpad::SyncScratchpad;

pub const GATEWAY_BASE: usize = 0x4002_3000;
pub const BOOT_RECORD_BASE: usize = 0x4002_3400;

pub const FLASH: Span = Span::new(0x0000_0000, mb!(16));

pub const LAYOUT: FlashLayout = FlashLayout {
    region: FLASH,
    // Two primary slots, then the recovery slot.
    candidates: &[0x0000_0000, 0x0040_0000, 0x00C0_0000],
    max_image_size: mb!(4) - kb!(64),
    itoc_stride: kb!(4),
    itoc_window: kb!(64),
    itoc_table_size: kb!(4),
};

pub const BUDGET: Budget = Budget { gateway_polls: 10_000, engine_polls: 4_000_000 };

pub const CONFIGURATION: Configuration = Configuration { layout: LAYOUT, budget: BUDGET };
const_assert!(CONFIGURATION.is_sound());

pub const SIGNATURE_CAPACITY: usize = 512;
pub const SEGMENTS: usize = 2;
pub const SEGMENT_SIZE: usize = kb!(8);
pub const SLOTS: usize = 4;
pub const SLOT_SIZE: usize = kb!(4);
const_assert!(SEGMENTS * SEGMENT_SIZE + SIGNATURE_CAPACITY <= kb!(17));
const_assert!(SLOTS * SLOT_SIZE + SIGNATURE_CAPACITY <= kb!(17));

/// Secondary core's bit in the engine core mask.
pub const ENGINE_CORE: u32 = 1 << 1;

pub type Gateway = IndirectGateway<Mmio>;
pub type Hint = BootRecord<Mmio>;

#[cfg(not(feature = "engine-offload"))]
pub type Scratchpad = SyncScratchpad<SLOTS, SLOT_SIZE>;

#[cfg(feature = "engine-offload")]
pub type Ring = SharedRing<SEGMENTS, SEGMENT_SIZE>;
#[cfg(feature = "engine-offload")]
pub type Scratchpad<C, D> = OffloadScratchpad<'static, C, D, SEGMENTS, SEGMENT_SIZE>;

/// Gateway and boot record drivers at their fixed addresses.
///
/// # Safety
///
/// Each core may hold at most one instance of each driver at a time.
pub unsafe fn peripherals() -> (Gateway, Hint) {
    (IndirectGateway::new(Mmio::new(GATEWAY_BASE)), BootRecord::new(Mmio::new(BOOT_RECORD_BASE)))
}

#[cfg(target_arch = "arm")]
pub use target::*;

#[cfg(target_arch = "arm")]
mod target {
    use super::*;
    use crate::devices::session::Authenticator;

    #[cfg(not(feature = "engine-offload"))]
    pub fn authenticator() -> Authenticator<Gateway, Hint, Scratchpad, SIGNATURE_CAPACITY> {
        // SAFETY: The authenticator becomes the sole owner of both drivers.
        let (gateway, hint) = unsafe { peripherals() };
        Authenticator::new(gateway, hint, Scratchpad::new(), CONFIGURATION)
    }

    #[cfg(feature = "engine-offload")]
    pub use offload::*;

    #[cfg(feature = "engine-offload")]
    mod offload {
        use super::*;
        use crate::{
            devices::{engine::CopyEngine, reader::Reader, scratchpad::OffloadScratchpad},
            drivers::cortex_m::{DataCache, EventDoorbell},
        };
        use ::cortex_m::peripheral::SCB;

        #[link_section = ".scratchpad"]
        pub static RING: Ring = Ring::new();

        pub type OffloadAuthenticator =
            Authenticator<Gateway, Hint, Scratchpad<DataCache, EventDoorbell>, SIGNATURE_CAPACITY>;

        pub fn authenticator(scb: SCB) -> OffloadAuthenticator {
            // SAFETY: The authenticator becomes the primary core's sole
            // owner of both drivers.
            let (gateway, hint) = unsafe { peripherals() };
            let scratchpad = OffloadScratchpad::new(
                &RING,
                DataCache::new(scb),
                EventDoorbell,
                engine_entry as usize,
                ENGINE_CORE,
                BUDGET.engine_polls,
            );
            Authenticator::new(gateway, hint, scratchpad, CONFIGURATION)
        }

        /// Where the secondary core starts executing once released.
        pub extern "C" fn engine_entry() -> ! {
            // SAFETY: Core peripherals are banked per core, and this is the
            // secondary core's only user of them. The gateway is shared in
            // hardware and arbitrated by its semaphore.
            let (scb, gateway) =
                unsafe { (::cortex_m::Peripherals::steal().SCB, peripherals().0) };
            let reader = Reader::new(gateway, BUDGET.gateway_polls);
            CopyEngine::new(&RING, reader, DataCache::new(scb), EventDoorbell, ENGINE_CORE).run()
        }
    }
}
