#![deny(unsafe_code)]
#![deny(warnings)]
//! W5500 Ethernet FeatherWing bring-up
//!
//! Owns everything between the raw STM32 peripherals and an embassy-net
//! driver: SPI2 with DMA, chip select, the reset and interrupt lines, the
//! hardware reset pulse, and the `embassy-net-wiznet` device/runner pair.

use defmt::{error, info, Debug2Format};
use embassy_embedded_hal::shared_bus::asynch::spi::SpiDevice;
use embassy_net_wiznet::chip::W5500;
use embassy_net_wiznet::{Device, Runner, State};
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{Level, Output, Pull, Speed};
use embassy_stm32::mode::Async;
use embassy_stm32::peripherals::{
    DMA1_CH3, DMA1_CH4, EXTI2, PB13, PB14, PB15, PC2, PC3, PC6, SPI2,
};
use embassy_stm32::spi::{self, Spi};
use embassy_stm32::time::Hertz;
use embassy_stm32::Peri;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::Timer;
use static_cell::StaticCell;

use crate::network::NetworkError;

/// W5500 SPI clock
const SPI_FREQUENCY: Hertz = Hertz(10_000_000);

/// Socket buffers handed to the wiznet driver (rx, tx)
const QUEUE_DEPTH: usize = 8;

type SpiBus = Mutex<CriticalSectionRawMutex, Spi<'static, Async>>;
type W5500Spi = SpiDevice<'static, CriticalSectionRawMutex, Spi<'static, Async>, Output<'static>>;

/// Driver task half; must be polled for the device to move any frames
pub type W5500Runner = Runner<'static, W5500, W5500Spi, ExtiInput<'static>, Output<'static>>;

/// Board pins and channels wired to the FeatherWing
pub struct W5500Pins {
    pub spi: Peri<'static, SPI2>,
    pub sck: Peri<'static, PB13>,
    pub mosi: Peri<'static, PB15>,
    pub miso: Peri<'static, PB14>,
    pub cs: Peri<'static, PC6>,
    pub reset: Peri<'static, PC3>,
    pub int: Peri<'static, PC2>,
    pub exti: Peri<'static, EXTI2>,
    pub dma_tx: Peri<'static, DMA1_CH4>,
    pub dma_rx: Peri<'static, DMA1_CH3>,
}

/// Configure the bus, pulse reset and start the W5500 driver
///
/// Must only be called once; the SPI bus and driver state live in statics.
pub async fn init_w5500(
    pins: W5500Pins,
    mac_addr: [u8; 6],
) -> Result<(Device<'static>, W5500Runner), NetworkError> {
    let mut spi_config = spi::Config::default();
    spi_config.frequency = SPI_FREQUENCY;
    let spi = Spi::new(
        pins.spi,
        pins.sck,
        pins.mosi,
        pins.miso,
        pins.dma_tx,
        pins.dma_rx,
        spi_config,
    );

    let cs = Output::new(pins.cs, Level::High, Speed::VeryHigh);
    let mut reset = Output::new(pins.reset, Level::High, Speed::Low);
    let int = ExtiInput::new(pins.int, pins.exti, Pull::Up);

    info!("Resetting W5500");
    reset.set_low();
    Timer::after_millis(1).await;
    reset.set_high();
    Timer::after_millis(2).await;

    static SPI_BUS: StaticCell<SpiBus> = StaticCell::new();
    let bus = SPI_BUS.init(Mutex::new(spi));

    info!(
        "MAC {:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
        mac_addr[0], mac_addr[1], mac_addr[2], mac_addr[3], mac_addr[4], mac_addr[5]
    );

    static STATE: StaticCell<State<QUEUE_DEPTH, QUEUE_DEPTH>> = StaticCell::new();
    let state = STATE.init(State::new());

    let (device, runner) =
        embassy_net_wiznet::new(mac_addr, state, SpiDevice::new(bus, cs), int, reset)
            .await
            .map_err(|e| {
                error!("W5500 init failed: {:?}", Debug2Format(&e));
                NetworkError::DeviceInit
            })?;

    info!("W5500 ready");
    Ok((device, runner))
}
