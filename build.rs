//! This build script copies the `memory.x` file from the crate root into
//! a directory where the linker can always find it at build time, and turns the
//! JSON files in `config/` into constants the firmware `include!`s.
//!
//! Missing config files are created with dummy values, so a fresh checkout builds.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::print_stdout)]

use serde::Deserialize;
use std::{
    env, fs,
    fs::File,
    io,
    io::Write,
    path::{Path, PathBuf},
};

/// Contents of `config/wifi_config.json`
#[derive(Deserialize)]
struct WifiConfig {
    /// Network name
    ssid: String,
    /// WPA2 passphrase
    password: String,
}

/// Contents of `config/alarm_config.json`
#[derive(Deserialize)]
struct AlarmConfig {
    /// MQTT broker host name or dotted IPv4 address
    mqtt_broker: String,
    /// MQTT broker TCP port
    mqtt_port: u16,
    /// Topic the schedule is published on
    mqtt_topic: String,
    /// Client id presented to the broker
    mqtt_client_id: String,
    /// SNTP server host name
    ntp_server: String,
    /// Fixed local offset from UTC in minutes
    utc_offset_minutes: i32,
    /// Give up firing after this many seconds, 0 waits for a button forever
    firing_timeout_secs: u64,
}

fn main() {
    memory_x();
    wifi_secrets().unwrap();
    alarm_config().unwrap();
}

/// Reads `config/<name>`, creating it from `dummy` first if it does not exist
fn read_config(name: &str, dummy: &str) -> String {
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR environment variable not set");
    let config_path = Path::new(&manifest_dir).join("config").join(name);
    println!("cargo:rerun-if-changed={}", config_path.display());
    if config_path.exists() {
        fs::read_to_string(config_path).expect("Could not read config file")
    } else {
        println!("{name} not found, creating with dummy values");
        fs::write(config_path, dummy).expect("Could not write dummy config file");
        dummy.to_string()
    }
}

/// Creates `name` in the output directory
fn out_file(name: &str) -> File {
    let out_dir = env::var("OUT_DIR").expect("OUT_DIR environment variable not set");
    File::create(Path::new(&out_dir).join(name)).expect("Could not create generated file")
}

/// Generate `wifi_secrets.rs` from `wifi_config.json`
fn wifi_secrets() -> io::Result<()> {
    let contents = read_config("wifi_config.json", r#"{"ssid":"dummy","password":"dummy"}"#);
    let config: WifiConfig = serde_json::from_str(&contents).expect("Could not parse wifi_config.json file");

    let mut f = out_file("wifi_secrets.rs");
    writeln!(f, "/// Network name to join")?;
    writeln!(f, "pub const SSID: &str = {:?};", config.ssid)?;
    writeln!(f, "/// WPA2 passphrase")?;
    writeln!(f, "pub const PASSWORD: &str = {:?};", config.password)?;
    Ok(())
}

/// Generate `alarm_config.rs` from `alarm_config.json`
fn alarm_config() -> io::Result<()> {
    let contents = read_config(
        "alarm_config.json",
        r#"{"mqtt_broker":"test.mosquitto.org","mqtt_port":1883,"mqtt_topic":"/topic/a159236","mqtt_client_id":"pico-mqtt-alarm","ntp_server":"pool.ntp.org","utc_offset_minutes":720,"firing_timeout_secs":0}"#,
    );
    let config: AlarmConfig = serde_json::from_str(&contents).expect("Could not parse alarm_config.json file");

    let mut f = out_file("alarm_config.rs");
    writeln!(f, "/// MQTT broker host name or IPv4 address")?;
    writeln!(f, "pub const MQTT_BROKER: &str = {:?};", config.mqtt_broker)?;
    writeln!(f, "/// MQTT broker port")?;
    writeln!(f, "pub const MQTT_PORT: u16 = {};", config.mqtt_port)?;
    writeln!(f, "/// Topic carrying the alarm schedule")?;
    writeln!(f, "pub const MQTT_TOPIC: &str = {:?};", config.mqtt_topic)?;
    writeln!(f, "/// MQTT client id")?;
    writeln!(f, "pub const MQTT_CLIENT_ID: &str = {:?};", config.mqtt_client_id)?;
    writeln!(f, "/// SNTP server host name")?;
    writeln!(f, "pub const NTP_SERVER: &str = {:?};", config.ntp_server)?;
    writeln!(f, "/// Local offset from UTC in minutes")?;
    writeln!(f, "pub const UTC_OFFSET_MINUTES: i32 = {};", config.utc_offset_minutes)?;
    writeln!(f, "/// Firing timeout in seconds, 0 disables it")?;
    writeln!(f, "pub const FIRING_TIMEOUT_SECS: u64 = {};", config.firing_timeout_secs)?;
    Ok(())
}

/// Handle the `memory.x` linker script
fn memory_x() {
    // Put `memory.x` in our output directory and ensure it's
    // on the linker search path.
    let out = &PathBuf::from(env::var_os("OUT_DIR").unwrap());
    File::create(out.join("memory.x"))
        .unwrap()
        .write_all(include_bytes!("memory.x"))
        .unwrap();
    println!("cargo:rustc-link-search={}", out.display());

    // By default, Cargo will re-run a build script whenever
    // any file in the project changes. By specifying `memory.x`
    // here, we ensure the build script is only re-run when
    // `memory.x` is changed.
    println!("cargo:rerun-if-changed=memory.x");

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
}
