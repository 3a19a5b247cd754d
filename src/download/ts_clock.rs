//! Stream-time progress for MPEG-TS payloads.
//!
//! The device does not report how far a playback has got, so progress is read from the
//! presentation timestamps carried in PES headers.

const PACKET_LEN: usize = 188;
const SYNC_BYTE: u8 = 0x47;
const PTS_HZ: f64 = 90_000.0;
const PTS_MODULUS: u64 = 1 << 33;

/// Extracts the PTS of a PES packet starting in this TS packet, if any.
pub fn packet_pts(packet: &[u8]) -> Option<u64> {
    if packet.len() < PACKET_LEN || packet[0] != SYNC_BYTE {
        return None;
    }
    let payload_unit_start = packet[1] & 0x40 != 0;
    let adaptation_control = (packet[3] >> 4) & 0x03;
    if !payload_unit_start || adaptation_control & 0x01 == 0 {
        return None;
    }
    let mut offset = 4;
    if adaptation_control & 0x02 != 0 {
        offset += 1 + packet[4] as usize;
    }
    let pes = packet.get(offset..PACKET_LEN)?;
    if pes.len() < 14 || !pes.starts_with(&[0x00, 0x00, 0x01]) {
        return None;
    }
    let pts_dts_flags = pes[7] >> 6;
    if pts_dts_flags & 0x02 == 0 {
        return None;
    }
    let p = &pes[9..14];
    Some(
        (((p[0] as u64) >> 1) & 0x07) << 30
            | (p[1] as u64) << 22
            | ((p[2] as u64) >> 1) << 15
            | (p[3] as u64) << 7
            | (p[4] as u64) >> 1,
    )
}

#[derive(Debug, Default)]
pub struct TsClock {
    first_pts: Option<u64>,
    elapsed: f64,
    carry: Vec<u8>,
}

impl TsClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds raw stream bytes (any alignment) and returns the furthest point reached, in seconds.
    pub fn feed(&mut self, data: &[u8]) -> f64 {
        self.carry.extend_from_slice(data);
        let mut pos = 0;
        while self.carry.len() - pos >= PACKET_LEN {
            if self.carry[pos] != SYNC_BYTE {
                // Lost sync: skip ahead to the next candidate sync byte.
                match self.carry[pos + 1..].iter().position(|b| *b == SYNC_BYTE) {
                    Some(skip) => pos += skip + 1,
                    None => pos = self.carry.len(),
                }
                continue;
            }
            if let Some(pts) = packet_pts(&self.carry[pos..pos + PACKET_LEN]) {
                self.observe(pts);
            }
            pos += PACKET_LEN;
        }
        self.carry.drain(..pos);
        self.elapsed
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed
    }

    fn observe(&mut self, pts: u64) {
        let first = *self.first_pts.get_or_insert(pts);
        let delta = (pts + PTS_MODULUS - first) % PTS_MODULUS;
        // Half the clock range or more means a timestamp slightly behind the first one.
        if delta >= PTS_MODULUS / 2 {
            return;
        }
        let secs = delta as f64 / PTS_HZ;
        if secs > self.elapsed {
            self.elapsed = secs;
        }
    }
}
