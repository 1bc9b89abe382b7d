#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use cyclo_core::app_state::Instrument;
use cyclo_core::config::TriggerEdge;
use cyclo_core::sensors::{WheelSensor, run_capture};
use cyclo_firmware::config::build_config;
use cyclo_firmware::render::RttRenderer;
use cyclo_firmware::sd_storage::{FixedTimeSource, SdCardStorage};
use embassy_executor::Spawner;
use embassy_time::{Duration, Instant, Timer};
use embedded_hal_bus::spi::ExclusiveDevice;
use esp_hal::clock::CpuClock;
use esp_hal::delay::Delay;
use esp_hal::gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull};
use esp_hal::spi::master::{Config as SpiConfig, Spi};
use esp_hal::time::Rate;
use esp_hal::timer::timg::TimerGroup;
use log::{LevelFilter, error, info};
use static_cell::StaticCell;

/// Main loop pass period
const LOOP_PERIOD: Duration = Duration::from_millis(5);

/// SD cards must be initialised at 400 kHz or less
const SD_SPI_KHZ: u32 = 400;

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

fn now_ms() -> u64 {
    Instant::now().as_millis()
}

/// Feeds reed switch edges into the shared wheel state
#[embassy_executor::task]
async fn wheel_task(mut pin: Input<'static>, edge: TriggerEdge, wheel: &'static WheelSensor) {
    info!("Wheel sensor listening on {} edges", edge.label());
    match run_capture(&mut pin, edge, wheel, now_ms).await {
        Ok(never) => match never {},
        Err(e) => error!("Wheel sensor input failed: {:?}", e),
    }
}

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!(LevelFilter::Info);

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized!");

    let odometer_config = build_config();

    static WHEEL: StaticCell<WheelSensor> = StaticCell::new();
    let wheel: &'static WheelSensor = WHEEL.init(WheelSensor::new(&odometer_config));

    // Reed switch closes to ground on falling-edge boards and to 3V3 on
    // rising-edge boards
    let pull = match odometer_config.trigger_edge {
        TriggerEdge::Falling => Pull::Up,
        TriggerEdge::Rising => Pull::Down,
    };
    let sensor_pin = Input::new(peripherals.GPIO2, InputConfig::default().with_pull(pull));
    let status_led = Output::new(peripherals.GPIO13, Level::Low, OutputConfig::default());

    // SD card on SPI2: CS=GPIO10, MOSI=GPIO11, SCK=GPIO12, MISO=GPIO14
    let sd_spi = Spi::new(
        peripherals.SPI2,
        SpiConfig::default()
            .with_frequency(Rate::from_khz(SD_SPI_KHZ))
            .with_mode(esp_hal::spi::Mode::_0),
    )
    .unwrap()
    .with_sck(peripherals.GPIO12)
    .with_mosi(peripherals.GPIO11)
    .with_miso(peripherals.GPIO14);
    let sd_cs = Output::new(peripherals.GPIO10, Level::High, OutputConfig::default());
    let sd_device = ExclusiveDevice::new_no_delay(sd_spi, sd_cs).unwrap();
    let sd_card = embedded_sdmmc::SdCard::new(sd_device, Delay::new());
    let storage = SdCardStorage::new(sd_card, FixedTimeSource);

    let mut instrument = Instrument::start(odometer_config, wheel, storage, status_led, now_ms())
        .expect("Failed to start instrument");

    spawner.spawn(wheel_task(sensor_pin, odometer_config.trigger_edge, wheel).unwrap());

    let mut renderer = RttRenderer;
    loop {
        if let Err(e) = instrument.poll(now_ms(), &mut renderer) {
            match e {}
        }
        Timer::after(LOOP_PERIOD).await;
    }
}
