#![no_std]
#![no_main]

use panic_halt as _;

mod serial;

#[rtic::app(device = stm32f4xx_hal::pac, peripherals = true)]
mod app {
    use rtic::mutex_prelude::*;
    use rtt_target::{rprintln, rtt_init_print};
    use sqm_firmware::{
        ambient_light::{SensorSettings, VemlBus},
        config::MeterConfig,
        control::ControlLoop,
        indicators::Indicators,
        telemetry,
    };
    use stm32f4xx_hal::{
        gpio::{gpioa, gpiob, gpioc, Alternate, OpenDrain, Output, PushPull},
        i2c::I2c,
        otg_fs::{UsbBus, UsbBusType, USB},
        pac,
        prelude::*,
        timer::SysDelay,
        watchdog::IndependentWatchdog,
    };
    use usb_device::{class_prelude::UsbBusAllocator, prelude::*};
    use usbd_serial::SerialPort;

    use crate::serial::{
        SerialPortType, SerialWriter, SERIAL_READ_BUFFER_BYTES, SERIAL_WRITE_BUFFER_BYTES,
    };

    // Watchdog timeout, well above the worst case cycle duration
    const WATCHDOG_TIMEOUT_MS: u32 = 8000;

    type LightSensorI2c = I2c<
        pac::I2C1,
        (
            gpiob::PB6<Alternate<4, OpenDrain>>,
            gpiob::PB7<Alternate<4, OpenDrain>>,
        ),
    >;

    type Meter = ControlLoop<VemlBus<LightSensorI2c>, gpioa::PA<Output<PushPull>>, SysDelay>;

    #[shared]
    struct Shared {
        usb_dev: UsbDevice<'static, UsbBusType>,
        serial: SerialPortType,
    }

    #[local]
    struct Local {
        meter: Meter,
        heartbeat: gpioc::PC13<Output<PushPull>>,
        watchdog: IndependentWatchdog,
    }

    #[init(local = [
        ep_memory: [u32; 1024] = [0; 1024],
        usb_bus: Option<UsbBusAllocator<UsbBusType>> = None,
    ])]
    fn init(ctx: init::Context) -> (Shared, Local, init::Monotonics) {
        rtt_init_print!();

        rprintln!("Initializing");

        // Clock setup. USB needs the 48 MHz PLL output.
        let rcc = ctx.device.RCC.constrain();
        let clocks = rcc
            .cfgr
            .use_hse(25.MHz())
            .sysclk(48.MHz())
            .require_pll48clk()
            .freeze();
        let delay = ctx.core.SYST.delay(&clocks);

        rprintln!("Clock setup done");

        // GPIO setup
        let gpioa = ctx.device.GPIOA.split();
        let gpiob = ctx.device.GPIOB.split();
        let gpioc = ctx.device.GPIOC.split();

        // I2C setup. SCL is PB6 and SDA is PB7 (both with AF04).
        let scl = gpiob.pb6.into_alternate_open_drain();
        let sda = gpiob.pb7.into_alternate_open_drain();
        let i2c = I2c::new(ctx.device.I2C1, (scl, sda), 400.kHz(), &clocks);

        // Indicator LEDs: green on PA1, yellow on PA2, red on PA3
        let indicators = Indicators::new(
            gpioa.pa1.into_push_pull_output().erase_number(),
            gpioa.pa2.into_push_pull_output().erase_number(),
            gpioa.pa3.into_push_pull_output().erase_number(),
        );
        let heartbeat = gpioc.pc13.into_push_pull_output();

        rprintln!("I2C and GPIO setup done");

        // Serial log over USB
        let usb = USB {
            usb_global: ctx.device.OTG_FS_GLOBAL,
            usb_device: ctx.device.OTG_FS_DEVICE,
            usb_pwrclk: ctx.device.OTG_FS_PWRCLK,
            pin_dm: gpioa.pa11.into_alternate(),
            pin_dp: gpioa.pa12.into_alternate(),
            hclk: clocks.hclk(),
        };
        let usb_bus: &'static _ = ctx.local.usb_bus.insert(UsbBus::new(usb, ctx.local.ep_memory));
        let serial = SerialPort::new_with_store(
            usb_bus,
            [0; SERIAL_READ_BUFFER_BYTES],
            [0; SERIAL_WRITE_BUFFER_BYTES],
        );
        let usb_dev = UsbDeviceBuilder::new(usb_bus, UsbVidPid(0x16c0, 0x27dd))
            .manufacturer("dbrgn")
            .product("Sky Quality Meter")
            .serial_number("SQM-1")
            .device_class(usbd_serial::USB_CLASS_CDC)
            .build();

        rprintln!("USB setup done");

        // Light sensor and measurement pipeline
        let bus = VemlBus::new(i2c, SensorSettings::default());
        let meter = match ControlLoop::start(MeterConfig::default(), bus, indicators, delay) {
            Ok(meter) => meter,
            Err(e) => {
                rprintln!("Fatal: {}", e);
                panic!("initialization failed");
            }
        };

        rprintln!("Light sensor setup done");

        let mut watchdog = IndependentWatchdog::new(ctx.device.IWDG);
        watchdog.start(WATCHDOG_TIMEOUT_MS.millis());

        rprintln!("Done initializing");

        (
            Shared { usb_dev, serial },
            Local {
                meter,
                heartbeat,
                watchdog,
            },
            init::Monotonics(),
        )
    }

    #[idle(shared = [serial], local = [meter, heartbeat, watchdog])]
    fn idle(mut ctx: idle::Context) -> ! {
        let heartbeat = ctx.local.heartbeat;
        let watchdog = ctx.local.watchdog;
        ctx.local.meter.run(|snapshot, errors| {
            if let Some((from, to)) = snapshot.state_change {
                rprintln!("State transition: {} -> {}", from.as_str(), to.as_str());
            }
            ctx.shared.serial.lock(|serial| {
                let mut writer = SerialWriter(serial);
                while let Some(e) = errors.dequeue() {
                    telemetry::write_error(&mut writer, &e).ok();
                }
                if let Err(e) = telemetry::write_snapshot(&mut writer, snapshot) {
                    rprintln!("{}", e.as_str());
                }
            });

            // Fed on fault cycles as well, only a hang resets the board
            heartbeat.toggle();
            watchdog.feed();
        })
    }

    #[task(binds = OTG_FS, shared = [usb_dev, serial])]
    fn usb_event(ctx: usb_event::Context) {
        (ctx.shared.usb_dev, ctx.shared.serial).lock(|usb_dev, serial| {
            if usb_dev.poll(&mut [serial]) {
                // Input from the host is discarded
                let mut buf = [0u8; SERIAL_READ_BUFFER_BYTES];
                serial.read(&mut buf).ok();
            }
        });
    }
}
