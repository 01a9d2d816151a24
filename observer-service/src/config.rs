use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use anyhow::Context;
use data_encoding::HEXLOWER_PERMISSIVE;
use serde::{Deserialize, Serialize};
use threema_gateway::SecretKey;

#[derive(Debug, PartialEq, Deserialize, Serialize)]
pub struct RawConfig {
    pub serial: Serial,
    pub threema: Option<RawThreema>,
    #[serde(default)]
    pub notify: Notify,
}

impl RawConfig {
    /// Parse the config file at the specified path.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file at {:?}", path))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .context("Failed to read config file to string")?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        toml::from_str(contents).context("Failed to parse config file")
    }

    pub fn example() -> Self {
        Self {
            serial: Serial {
                port: PathBuf::from("/dev/ttyACM0"),
                baudrate: 115200,
            },
            threema: Some(RawThreema {
                gateway_id: "*YOUR_ID".to_string(),
                gateway_secret: "your-gateway-secret".to_string(),
                private_key: "00112233..CCDDEEFF".to_string(),
                recipients: vec!["AAAAAAAA".to_string(), "BBBBBBBB".to_string()],
            }),
            notify: Notify::default(),
        }
    }
}

#[derive(Debug, PartialEq, Deserialize, Serialize)]
pub struct Serial {
    /// The serial port.
    pub port: PathBuf,

    /// The baud rate.
    pub baudrate: u32,
}

#[derive(Debug, PartialEq, Deserialize, Serialize)]
pub struct RawThreema {
    /// Gateway ID (8 characters)
    pub gateway_id: String,

    /// Gateway secret (from the Gateway website)
    pub gateway_secret: String,

    /// Private key (32 bytes as lowercase hex string)
    pub private_key: String,

    /// List of recipients (Threema IDs)
    pub recipients: Vec<String>,
}

/// Which events trigger a notification.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Notify {
    /// Notify when a different sky quality indicator lights up
    pub on_indicator_change: bool,

    /// Notify when the light sensor becomes unavailable or recovers
    pub on_sensor_fault: bool,
}

impl Default for Notify {
    fn default() -> Self {
        Self {
            on_indicator_change: true,
            on_sensor_fault: true,
        }
    }
}

#[derive(Debug)]
pub struct Config {
    pub serial: Serial,
    pub threema: Option<Threema>,
    pub notify: Notify,
}

#[derive(Debug)]
pub struct Threema {
    /// Gateway ID (8 characters)
    pub gateway_id: String,

    /// Gateway secret (from the Gateway website)
    pub gateway_secret: String,

    /// Private key
    pub private_key: SecretKey,

    /// List of recipients (Threema IDs)
    pub recipients: Vec<String>,
}

impl TryFrom<RawConfig> for Config {
    type Error = anyhow::Error;

    fn try_from(raw_config: RawConfig) -> Result<Self, Self::Error> {
        // Validate RawThreema config
        let threema = match raw_config.threema {
            Some(raw_threema) => {
                if raw_threema.recipients.is_empty() {
                    anyhow::bail!("Threema config needs at least one recipient");
                }
                let private_key = SecretKey::from_slice(
                    HEXLOWER_PERMISSIVE
                        .decode(raw_threema.private_key.as_bytes())
                        .context("Could not decode Threema private key hex string")?
                        .as_ref(),
                )
                .ok_or(anyhow::anyhow!("Invalid Threema private key"))?;
                Some(Threema {
                    gateway_id: raw_threema.gateway_id,
                    gateway_secret: raw_threema.gateway_secret,
                    private_key,
                    recipients: raw_threema.recipients,
                })
            }
            None => None,
        };

        Ok(Config {
            serial: raw_config.serial,
            threema,
            notify: raw_config.notify,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_roundtrip() {
        let example = RawConfig::example();
        let serialized = toml::to_string(&example).unwrap();
        assert_eq!(RawConfig::parse(&serialized).unwrap(), example);
    }

    #[test]
    fn test_minimal_config() {
        let raw = RawConfig::parse(
            r#"
            [serial]
            port = "/dev/ttyACM1"
            baudrate = 9600
            "#,
        )
        .unwrap();
        assert_eq!(raw.notify, Notify::default());

        let config: Config = raw.try_into().unwrap();
        assert!(config.threema.is_none());
        assert_eq!(config.serial.port, PathBuf::from("/dev/ttyACM1"));
    }

    #[test]
    fn test_partial_notify_section() {
        let raw = RawConfig::parse(
            r#"
            [serial]
            port = "/dev/ttyACM0"
            baudrate = 115200

            [notify]
            on_indicator_change = false
            "#,
        )
        .unwrap();
        assert!(!raw.notify.on_indicator_change);
        assert!(raw.notify.on_sensor_fault);
    }

    #[test]
    fn test_invalid_private_key() {
        // The example key is not valid hex
        let result: anyhow::Result<Config> = RawConfig::example().try_into();
        assert!(result.is_err());

        let mut raw = RawConfig::example();
        if let Some(threema) = raw.threema.as_mut() {
            threema.private_key = "0011".to_string();
        }
        let result: anyhow::Result<Config> = raw.try_into();
        assert!(result.is_err());
    }

    #[test]
    fn test_valid_private_key() {
        let mut raw = RawConfig::example();
        if let Some(threema) = raw.threema.as_mut() {
            threema.private_key = "ab".repeat(32);
        }
        let config: Config = raw.try_into().unwrap();
        assert_eq!(config.threema.unwrap().recipients.len(), 2);
    }
}
