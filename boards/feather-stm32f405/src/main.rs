#![deny(unsafe_code)]
#![deny(warnings)]
#![no_main]
#![no_std]

use defmt_rtt as _; // global logger
use panic_probe as _;
use rtic::app;
use rtic_monotonics::systick::prelude::*;

mod buffers;
mod clock;
mod display;
mod eth;
mod network;

systick_monotonic!(Mono, 1_000);

#[app(device = embassy_stm32, peripherals = true, dispatchers = [UART4, UART5])]
mod app {
    use super::*;
    use defmt::{error, info};
    use embassy_futures::join::join3;
    use embassy_stm32::gpio::{Level, Output, Speed};
    use embassy_stm32::rcc::{Hse, HseMode};
    use embassy_stm32::time::Hertz;
    use embassy_stm32::usart::{self, UartTx};
    use embassy_time::{Delay, Duration};
    use splitflap_core::ControlLoop;

    use clock::EmbassyClock;
    use display::SplitFlapUart;
    use network::{EthLink, MqttSession, NetworkConfig, TcpHttpClient};

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        led: Output<'static>,
    }

    #[init]
    fn init(cx: init::Context) -> (Shared, Local) {
        info!("Split-flap clock starting...");

        // Adafruit Feather STM32F405: 12 MHz HSE
        let mut config = embassy_stm32::Config::default();
        config.rcc.hse = Some(Hse {
            freq: Hertz(12_000_000),
            mode: HseMode::Oscillator,
        });

        // HSE (12 MHz) / PREDIV(6) = 2 MHz (PLL input)
        // 2 MHz * MUL(168) = 336 MHz (VCO)
        // VCO / DIVP(4) = 84 MHz (SYSCLK)
        config.rcc.pll_src = embassy_stm32::rcc::PllSource::HSE;
        config.rcc.pll = Some(embassy_stm32::rcc::Pll {
            prediv: embassy_stm32::rcc::PllPreDiv::DIV6,
            mul: embassy_stm32::rcc::PllMul::MUL168,
            divp: Some(embassy_stm32::rcc::PllPDiv::DIV4),
            divq: Some(embassy_stm32::rcc::PllQDiv::DIV7),
            divr: None,
        });
        config.rcc.sys = embassy_stm32::rcc::Sysclk::PLL1_P;
        config.rcc.ahb_pre = embassy_stm32::rcc::AHBPrescaler::DIV1; // 84 MHz
        config.rcc.apb1_pre = embassy_stm32::rcc::APBPrescaler::DIV2; // 42 MHz
        config.rcc.apb2_pre = embassy_stm32::rcc::APBPrescaler::DIV1; // 84 MHz

        let p = embassy_stm32::init(config);
        info!("System initialized: SYSCLK=84MHz from 12MHz HSE");

        Mono::start(cx.core.SYST, 84_000_000);

        let led = Output::new(p.PC1, Level::High, Speed::Low);

        // Module controller on the Feather TX pin
        let mut uart_config = usart::Config::default();
        uart_config.baudrate = display::BAUD_RATE;
        let display = match UartTx::new_blocking(p.USART3, p.PB10, uart_config) {
            Ok(tx) => SplitFlapUart::new(tx),
            Err(e) => defmt::panic!("Display UART config rejected: {:?}", e),
        };

        let w5500_pins = eth::W5500Pins {
            spi: p.SPI2,
            sck: p.PB13,
            mosi: p.PB15,
            miso: p.PB14,
            cs: p.PC6,
            reset: p.PC3,
            int: p.PC2,
            exti: p.EXTI2,
            dma_tx: p.DMA1_CH4,
            dma_rx: p.DMA1_CH3,
        };

        heartbeat::spawn().ok();
        network_task::spawn(w5500_pins, display).ok();

        (Shared {}, Local { led })
    }

    /// Heartbeat task
    #[task(priority = 1, local = [led])]
    async fn heartbeat(cx: heartbeat::Context) {
        info!("Heartbeat task started");
        loop {
            cx.local.led.set_high();
            Mono::delay(100.millis()).await;
            cx.local.led.set_low();
            Mono::delay(4900.millis()).await;
        }
    }

    /// Network task - runs the network stack and the control loop
    ///
    /// Stack is !Send and must remain within this task.
    #[task(priority = 1)]
    async fn network_task(
        _cx: network_task::Context,
        pins: eth::W5500Pins,
        display: SplitFlapUart,
    ) {
        use embassy_net::{Config, StackResources};
        use static_cell::StaticCell;

        info!("Network task started");

        let net_config = NetworkConfig::default();
        let device_config = network::config::device_config();

        let (device, w5500_runner) = match eth::init_w5500(pins, net_config.mac_addr).await {
            Ok(parts) => parts,
            Err(e) => {
                error!("Ethernet unavailable: {}", e);
                return;
            }
        };

        static RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();
        let (stack, mut net_runner) = embassy_net::new(
            device,
            Config::dhcpv4(Default::default()),
            RESOURCES.init(StackResources::new()),
            net_config.seed,
        );
        info!("Network stack initialized with DHCP");

        let socket_timeout = Duration::from_millis(net_config.socket_timeout_ms);
        let link = EthLink::new(stack, Duration::from_millis(net_config.dhcp_timeout_ms));
        let session = MqttSession::new(stack, device_config.broker, socket_timeout);
        let http = TcpHttpClient::new(stack, socket_timeout);

        let mut control = ControlLoop::new(link, session, http, display, EmbassyClock, &device_config);

        let app_logic = async {
            let mut delay = Delay;
            if let Err(e) = control.run(&mut delay).await {
                error!("Control loop stopped: {}", e);
            }
        };

        join3(w5500_runner.run(), net_runner.run(), app_logic).await;
    }

    /// RTIC idle task - WFI sleep mode when no tasks active
    #[idle]
    fn idle(_cx: idle::Context) -> ! {
        info!("Idle task started - entering WFI loop");
        loop {
            cortex_m::asm::wfi();
        }
    }
}
