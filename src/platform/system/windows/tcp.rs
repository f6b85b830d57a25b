//! TCP table and extended statistics through the IP Helper API.

use std::ffi::c_void;
use std::mem;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::ptr::null_mut;

use windows_sys::Win32::Foundation::{ERROR_INSUFFICIENT_BUFFER, NO_ERROR};
use windows_sys::Win32::NetworkManagement::IpHelper::{
    GetExtendedTcpTable, GetPerTcpConnectionEStats, SetPerTcpConnectionEStats,
    TcpConnectionEstatsData, MIB_TCPROW_LH, MIB_TCPROW_LH_0, MIB_TCPROW_OWNER_PID,
    MIB_TCPTABLE_OWNER_PID, TCP_ESTATS_DATA_ROD_v0, TCP_ESTATS_DATA_RW_v0,
    TCP_TABLE_OWNER_PID_ALL,
};
use windows_sys::Win32::Networking::WinSock::AF_INET;

use crate::core::energy::sensors::{TcpByteCounts, TcpConnection, TcpState, TcpStatsProvider};
use crate::error::{EcoflocError, Result};

const MIB_TCP_STATE_ESTAB: u32 = 5;

/// IPv4 TCP statistics for the whole system
pub struct IpHelperTcpStats {
    // u32 words keep the table aligned
    buffer: Vec<u32>,
}

impl IpHelperTcpStats {
    /// Probe the table once so a missing API fails at construction
    pub fn new() -> Result<Self> {
        let mut stats = Self { buffer: Vec::new() };
        stats.load_table().map_err(|e| {
            EcoflocError::resource_acquisition(format!("TCP table unavailable: {}", e))
        })?;
        Ok(stats)
    }

    fn load_table(&mut self) -> Result<Vec<MIB_TCPROW_OWNER_PID>> {
        fill_growing(&mut self.buffer, |table, size| unsafe {
            GetExtendedTcpTable(table, size, 1, AF_INET as u32, TCP_TABLE_OWNER_PID_ALL, 0)
        })?;

        let rows = unsafe {
            let table = &*(self.buffer.as_ptr() as *const MIB_TCPTABLE_OWNER_PID);
            std::slice::from_raw_parts(table.table.as_ptr(), table.dwNumEntries as usize).to_vec()
        };
        Ok(rows)
    }
}

/// Attempts before giving up on a table that keeps growing
const TABLE_ATTEMPTS: usize = 4;

/// Run a size-then-fill IP Helper call, growing `buffer` for as long as the
/// call reports `ERROR_INSUFFICIENT_BUFFER`
fn fill_growing<F>(buffer: &mut Vec<u32>, mut call: F) -> Result<()>
where
    F: FnMut(*mut c_void, &mut u32) -> u32,
{
    let mut size = (buffer.len() * mem::size_of::<u32>()) as u32;

    for _ in 0..TABLE_ATTEMPTS {
        let table = if buffer.is_empty() {
            null_mut()
        } else {
            buffer.as_mut_ptr().cast()
        };

        match call(table, &mut size) {
            NO_ERROR if !buffer.is_empty() => return Ok(()),
            NO_ERROR | ERROR_INSUFFICIENT_BUFFER => {
                buffer.resize((size as usize).div_ceil(mem::size_of::<u32>()), 0);
            }
            status => {
                return Err(EcoflocError::sensor_unavailable(format!(
                    "GetExtendedTcpTable failed ({})",
                    status
                )))
            }
        }
    }

    Err(EcoflocError::sensor_unavailable(format!(
        "TCP table still growing after {} attempts",
        TABLE_ATTEMPTS
    )))
}

fn to_socket(addr: u32, port: u32) -> SocketAddrV4 {
    SocketAddrV4::new(Ipv4Addr::from(addr.to_ne_bytes()), u16::from_be(port as u16))
}

fn to_connection(row: &MIB_TCPROW_OWNER_PID) -> TcpConnection {
    TcpConnection {
        local: to_socket(row.dwLocalAddr, row.dwLocalPort),
        remote: to_socket(row.dwRemoteAddr, row.dwRemotePort),
        state: if row.dwState == MIB_TCP_STATE_ESTAB {
            TcpState::Established
        } else {
            TcpState::Other(row.dwState)
        },
        owning_pid: row.dwOwningPid,
    }
}

fn to_row(conn: &TcpConnection) -> MIB_TCPROW_LH {
    let state = match conn.state {
        TcpState::Established => MIB_TCP_STATE_ESTAB,
        TcpState::Other(state) => state,
    };
    MIB_TCPROW_LH {
        Anonymous: MIB_TCPROW_LH_0 { dwState: state },
        dwLocalAddr: u32::from_ne_bytes(conn.local.ip().octets()),
        dwLocalPort: conn.local.port().to_be() as u32,
        dwRemoteAddr: u32::from_ne_bytes(conn.remote.ip().octets()),
        dwRemotePort: conn.remote.port().to_be() as u32,
    }
}

impl TcpStatsProvider for IpHelperTcpStats {
    fn connections(&mut self) -> Result<Vec<TcpConnection>> {
        Ok(self.load_table()?.iter().map(to_connection).collect())
    }

    fn enable_extended_stats(&mut self, conn: &TcpConnection) -> Result<()> {
        let row = to_row(conn);
        // EnableCollection = TRUE
        let rw = [1u8; mem::size_of::<TCP_ESTATS_DATA_RW_v0>()];
        let status = unsafe {
            SetPerTcpConnectionEStats(
                &row,
                TcpConnectionEstatsData,
                rw.as_ptr(),
                0,
                rw.len() as u32,
                0,
            )
        };
        if status != NO_ERROR {
            return Err(EcoflocError::sensor_unavailable(format!(
                "SetPerTcpConnectionEStats failed ({})",
                status
            )));
        }
        Ok(())
    }

    fn byte_counts(&mut self, conn: &TcpConnection) -> Result<TcpByteCounts> {
        let row = to_row(conn);
        let mut rod: TCP_ESTATS_DATA_ROD_v0 = unsafe { mem::zeroed() };
        let status = unsafe {
            GetPerTcpConnectionEStats(
                &row,
                TcpConnectionEstatsData,
                null_mut(),
                0,
                0,
                null_mut(),
                0,
                0,
                (&mut rod as *mut TCP_ESTATS_DATA_ROD_v0).cast(),
                0,
                mem::size_of::<TCP_ESTATS_DATA_ROD_v0>() as u32,
            )
        };
        if status != NO_ERROR {
            return Err(EcoflocError::sensor_unavailable(format!(
                "GetPerTcpConnectionEStats failed ({})",
                status
            )));
        }

        Ok(TcpByteCounts {
            bytes_in: rod.DataBytesIn,
            bytes_out: rod.DataBytesOut,
        })
    }
}
