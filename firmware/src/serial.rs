//! Helpers for using the serial port.

use sqm_firmware::errors::Error;
use stm32f4xx_hal::otg_fs::UsbBusType;
use usbd_serial::SerialPort;

// Configure serial buffer
pub const SERIAL_READ_BUFFER_BYTES: usize = 64;
pub const SERIAL_WRITE_BUFFER_BYTES: usize = 1024;

/// Type alias for the serial port type
pub type SerialPortType = SerialPort<
    'static,
    UsbBusType,
    [u8; SERIAL_READ_BUFFER_BYTES],
    [u8; SERIAL_WRITE_BUFFER_BYTES],
>;

/// Wrapper for a `SerialPort` that supports ufmt
pub struct SerialWriter<'a>(pub &'a mut SerialPortType);

impl<'a> ufmt::uWrite for SerialWriter<'a> {
    type Error = Error;
    fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
        // Lines are dropped when no host is listening
        let mut bytes = s.as_bytes();
        while !bytes.is_empty() {
            match self.0.write(bytes) {
                Ok(written) => bytes = &bytes[written..],
                Err(usb_device::UsbError::WouldBlock) => return Ok(()),
                Err(_) => return Err(Error::UfmtSerialWriteError),
            }
        }
        Ok(())
    }
}
