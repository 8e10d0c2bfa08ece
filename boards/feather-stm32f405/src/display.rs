#![deny(unsafe_code)]
#![deny(warnings)]
//! Split-flap module controller over UART
//!
//! The modules are driven by a separate controller board listening on
//! USART3 (Feather TX pin, 38400 8N1). One frame per update:
//!
//! ```text
//! '=' text '\n'    move each module the shortest way to its new character
//! '@' text '\n'    move every module through a full rotation first
//! ```
//!
//! Line breaks inside the text are dropped so they cannot end a frame early.

use defmt::warn;
use embassy_stm32::mode::Blocking;
use embassy_stm32::usart::{self, UartTx};
use hal_abstractions::DisplaySink;

/// UART baud rate of the module controller
pub const BAUD_RATE: u32 = 38_400;

const SHORTEST_PATH: u8 = b'=';
const FULL_ROTATION: u8 = b'@';
const END_OF_FRAME: u8 = b'\n';

pub struct SplitFlapUart {
    tx: UartTx<'static, Blocking>,
}

impl SplitFlapUart {
    pub fn new(tx: UartTx<'static, Blocking>) -> Self {
        Self { tx }
    }

    fn write_frame(&mut self, text: &[u8], force_full_rotation: bool) -> Result<(), usart::Error> {
        let mode = if force_full_rotation {
            FULL_ROTATION
        } else {
            SHORTEST_PATH
        };
        self.tx.blocking_write(&[mode])?;
        for segment in text.split(|&b| b == b'\n' || b == b'\r') {
            self.tx.blocking_write(segment)?;
        }
        self.tx.blocking_write(&[END_OF_FRAME])?;
        self.tx.blocking_flush()
    }
}

impl DisplaySink for SplitFlapUart {
    fn show(&mut self, text: &[u8], force_full_rotation: bool) {
        if let Err(e) = self.write_frame(text, force_full_rotation) {
            warn!("Display write failed: {:?}", e);
        }
    }
}
