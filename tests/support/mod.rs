//! Simulated Ether I/O board for integration tests.
//!
//! A thread owning a loopback UDP socket that implements the register,
//! EEPROM, diagnostics, pin and identify commands the way the firmware does.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use ether_io::{DeviceConfig, Variant};

/// Register codes answered with 3-byte replies.
const REGISTER_CODES: &[u8] = b"!@#$%";

/// MAC address reported by simulated boards; the last byte is per board.
pub const MAC_PREFIX: [u8; 5] = [0x00, 0x0E, 0xC6, 0x10, 0x20];

#[derive(Default)]
struct BoardState {
    /// (register code, upper-case port) -> value; code 0 is the value register.
    registers: HashMap<(u8, u8), u8>,
    eeprom: HashMap<u8, (u8, u8)>,
    eeprom_writable: bool,
    pins: HashMap<u8, bool>,
    spi: Vec<u8>,
    received: Vec<Vec<u8>>,
}

/// Board behaviour knobs.
#[derive(Debug, Clone, Copy)]
pub struct BoardOptions {
    /// Treat `H`/`L` + byte as pin commands (TPC firmware).
    pub pin_commands: bool,
    /// Last byte of the MAC address.
    pub mac_suffix: u8,
    /// Firmware version bytes.
    pub firmware: [u8; 2],
}

impl Default for BoardOptions {
    fn default() -> Self {
        Self {
            pin_commands: false,
            mac_suffix: 0x01,
            firmware: [1, 4],
        }
    }
}

/// Handle to a running simulated board; stops the board on drop.
pub struct SimulatedBoard {
    addr: SocketAddr,
    state: Arc<Mutex<BoardState>>,
    silent: Arc<AtomicBool>,
    reply_delay_ms: Arc<AtomicU64>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SimulatedBoard {
    pub fn start() -> Self {
        Self::with_options(BoardOptions::default())
    }

    pub fn start_tpc() -> Self {
        Self::with_options(BoardOptions {
            pin_commands: true,
            ..BoardOptions::default()
        })
    }

    pub fn with_options(options: BoardOptions) -> Self {
        let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        socket
            .set_read_timeout(Some(Duration::from_millis(10)))
            .unwrap();
        let addr = socket.local_addr().unwrap();

        let state = Arc::new(Mutex::new(BoardState::default()));
        let silent = Arc::new(AtomicBool::new(false));
        let reply_delay_ms = Arc::new(AtomicU64::new(0));
        let stop = Arc::new(AtomicBool::new(false));

        let handle = {
            let state = Arc::clone(&state);
            let silent = Arc::clone(&silent);
            let reply_delay_ms = Arc::clone(&reply_delay_ms);
            let stop = Arc::clone(&stop);
            thread::spawn(move || serve(socket, options, state, silent, reply_delay_ms, stop))
        };

        Self {
            addr,
            state,
            silent,
            reply_delay_ms,
            stop,
            handle: Some(handle),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn config(&self, variant: Variant) -> DeviceConfig {
        DeviceConfig::new(variant, Ipv4Addr::LOCALHOST)
            .with_port(self.addr.port())
            .with_timeout(Duration::from_millis(500))
    }

    /// Stops answering (requests are still recorded).
    pub fn set_silent(&self, silent: bool) {
        self.silent.store(silent, Ordering::SeqCst);
    }

    /// Holds every reply back for `delay` before sending it.
    pub fn set_reply_delay(&self, delay: Duration) {
        self.reply_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn received(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().received.clone()
    }

    pub fn clear_received(&self) {
        self.state.lock().unwrap().received.clear();
    }

    pub fn register(&self, code: u8, port: char) -> u8 {
        let port = port.to_ascii_uppercase() as u8;
        let state = self.state.lock().unwrap();
        state.registers.get(&(code, port)).copied().unwrap_or(0)
    }

    pub fn set_register(&self, code: u8, port: char, value: u8) {
        let port = port.to_ascii_uppercase() as u8;
        self.state
            .lock()
            .unwrap()
            .registers
            .insert((code, port), value);
    }

    pub fn pin(&self, pin: u8) -> Option<bool> {
        self.state.lock().unwrap().pins.get(&pin).copied()
    }

    pub fn spi_bytes(&self) -> Vec<u8> {
        self.state.lock().unwrap().spi.clone()
    }
}

impl Drop for SimulatedBoard {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn serve(
    socket: UdpSocket,
    options: BoardOptions,
    state: Arc<Mutex<BoardState>>,
    silent: Arc<AtomicBool>,
    reply_delay_ms: Arc<AtomicU64>,
    stop: Arc<AtomicBool>,
) {
    let mut buf = [0u8; 512];
    while !stop.load(Ordering::SeqCst) {
        let Ok((n, from)) = socket.recv_from(&mut buf) else {
            continue;
        };
        let request = &buf[..n];

        let reply = {
            let mut state = state.lock().unwrap();
            state.received.push(request.to_vec());
            respond(&mut state, &options, request)
        };

        if silent.load(Ordering::SeqCst) {
            continue;
        }
        if let Some(reply) = reply {
            let delay = reply_delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                thread::sleep(Duration::from_millis(delay));
            }
            let _ = socket.send_to(&reply, from);
        }
    }
}

fn respond(state: &mut BoardState, options: &BoardOptions, request: &[u8]) -> Option<Vec<u8>> {
    match *request {
        [b'I', b'O', b'2', b'4'] => {
            let mut reply = b"IO24".to_vec();
            reply.extend_from_slice(&MAC_PREFIX);
            reply.push(options.mac_suffix);
            reply.extend_from_slice(&options.firmware);
            Some(reply)
        }
        [b'%'] => Some(vec![
            b'%', 0x00, 0x30, 0x39, // serial 12345
            127, 0, 0, 1, // ip
            MAC_PREFIX[0], MAC_PREFIX[1], MAC_PREFIX[2], MAC_PREFIX[3], MAC_PREFIX[4],
            options.mac_suffix, // mac
            0x09, 0x78, // port 2424
        ]),
        [b'*'] => Some(vec![b' ']),
        [b'`', byte] => Some(vec![byte]),
        [port] if port.is_ascii_lowercase() => {
            let upper = port.to_ascii_uppercase();
            let value = state.registers.get(&(0, upper)).copied().unwrap_or(0);
            Some(vec![upper, value])
        }
        [code @ (b'H' | b'L'), pin] if options.pin_commands => {
            state.pins.insert(pin, code == b'H');
            None
        }
        [port, value] if port.is_ascii_uppercase() => {
            state.registers.insert((0, port), value);
            None
        }
        [code, port] if REGISTER_CODES.contains(&code) && port.is_ascii_lowercase() => {
            let upper = port.to_ascii_uppercase();
            let value = state.registers.get(&(code, upper)).copied().unwrap_or(0);
            Some(vec![code, upper, value])
        }
        [code, port, value] if REGISTER_CODES.contains(&code) && port.is_ascii_uppercase() => {
            state.registers.insert((code, port), value);
            None
        }
        [b'S', b'A', len, ref data @ ..] if data.len() == usize::from(len) => {
            state.spi.extend_from_slice(data);
            None
        }
        [b'\'', b'@', 0, 0xAA, 0x55] => {
            state.registers.clear();
            None
        }
        [b'\'', b'1', 0, 0xAA, 0x55] => {
            state.eeprom_writable = true;
            None
        }
        [b'\'', b'0', 0, 0, 0] => {
            state.eeprom_writable = false;
            None
        }
        [b'\'', b'E', addr, 0xAA, 0x55] if state.eeprom_writable => {
            state.eeprom.insert(addr, (0xFF, 0xFF));
            None
        }
        [b'\'', b'W', addr, msb, lsb] if state.eeprom_writable => {
            state.eeprom.insert(addr, (msb, lsb));
            None
        }
        [b'\'', b'R', addr, 0, 0] => {
            let (msb, lsb) = state.eeprom.get(&addr).copied().unwrap_or((0xFF, 0xFF));
            Some(vec![b'R', addr, msb, lsb])
        }
        _ => None,
    }
}
