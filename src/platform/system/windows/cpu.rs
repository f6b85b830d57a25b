use crate::error::{EcoflocError, Result};
use serde::Deserialize;
use wmi::WMIConnection;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct Win32Processor {
    current_clock_speed: Option<u32>, // MHz
    current_voltage: Option<u16>,
    number_of_logical_processors: Option<u32>,
}

/// Clock (Hz) and voltage (V) of one package, repeated per logical core
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessorReading {
    pub clock_hz: f32,
    pub voltage: Option<f32>,
    pub logical_cores: u32,
}

/// Decode `CurrentVoltage`: bit 7 set means tenths of a volt in bits 0-6
fn decode_voltage(raw: u16) -> Option<f32> {
    if raw & 0x80 != 0 {
        Some((raw & 0x7F) as f32 / 10.0)
    } else {
        None
    }
}

/// Query every processor package through WMI
pub fn processor_clocks_and_voltages() -> Result<Vec<ProcessorReading>> {
    let wmi_con = WMIConnection::new().map_err(|e| {
        EcoflocError::sensor_unavailable(format!("Failed to connect to WMI: {}", e))
    })?;

    let processors: Vec<Win32Processor> = wmi_con
        .query()
        .map_err(|e| EcoflocError::sensor_unavailable(format!("WMI query failed: {}", e)))?;

    Ok(processors
        .into_iter()
        .filter_map(|p| {
            Some(ProcessorReading {
                clock_hz: p.current_clock_speed? as f32 * 1.0e6,
                voltage: p.current_voltage.and_then(decode_voltage),
                logical_cores: p.number_of_logical_processors.unwrap_or(1).max(1),
            })
        })
        .collect())
}
