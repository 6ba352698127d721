//! TC transfer frame parsing (CCSDS 232.0-B primary header, plus the SDLS
//! security header/trailer whose widths come from the selected SA, not a
//! fixed layout). Parsed with the usual fixed-offset slice-and-`try_into`
//! style, generalized since the security header here is per-SA variable
//! width rather than fixed.

use crate::error::SdlsError;

pub const PRIMARY_HEADER_LEN: usize = 5;
pub const SPI_FIELD_LEN: usize = 2;
pub const SEGMENT_HEADER_LEN: usize = 1;
pub const FECF_LEN: usize = 2;

/// 5-byte TC primary header: `tfvn:2 | bypass:1 | cc:1 | spare:2 | scid:10 |
/// vcid:6 | frame_len:10 | fsn:8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcPrimaryHeader {
    pub tfvn: u8,
    pub bypass: bool,
    pub control_command: bool,
    pub scid: u16,
    pub vcid: u8,
    pub frame_len: u16,
    pub fsn: u8,
}

impl TcPrimaryHeader {
    pub fn parse(data: &[u8]) -> Result<Self, SdlsError> {
        if data.len() < PRIMARY_HEADER_LEN {
            return Err(SdlsError::NullBuffer);
        }
        let first_word = u16::from_be_bytes([data[0], data[1]]);
        let second_word = u16::from_be_bytes([data[2], data[3]]);
        Ok(TcPrimaryHeader {
            tfvn: ((first_word >> 14) & 0x3) as u8,
            bypass: (first_word >> 13) & 0x1 != 0,
            control_command: (first_word >> 12) & 0x1 != 0,
            scid: first_word & 0x3FF,
            vcid: ((second_word >> 10) & 0x3F) as u8,
            frame_len: second_word & 0x3FF,
            fsn: data[4],
        })
    }

    pub fn encode(&self) -> [u8; PRIMARY_HEADER_LEN] {
        let first_word: u16 = ((self.tfvn as u16 & 0x3) << 14)
            | ((self.bypass as u16) << 13)
            | ((self.control_command as u16) << 12)
            | (self.scid & 0x3FF);
        let second_word: u16 = ((self.vcid as u16 & 0x3F) << 10) | (self.frame_len & 0x3FF);
        let fw = first_word.to_be_bytes();
        let sw = second_word.to_be_bytes();
        [fw[0], fw[1], sw[0], sw[1], self.fsn]
    }
}

/// A TC frame decomposed into its addressable regions. Security-header and
/// trailer widths are supplied by the caller (drawn from the selected SA),
/// not inferred from the bytes themselves — the widths are an SA property,
/// never hardcoded.
#[derive(Debug, Clone)]
pub struct TcFrameLayout<'a> {
    pub primary: TcPrimaryHeader,
    pub has_segment_hdr: bool,
    pub segment_header: Option<u8>,
    pub spi: u16,
    /// IV || ARSN || pad-length region, `shivf_len + shsnf_len + shplf_len`
    /// bytes, immediately following the SPI field.
    pub security_header: &'a [u8],
    pub payload: &'a [u8],
    pub trailer: &'a [u8],
    pub fecf: Option<[u8; FECF_LEN]>,
}

impl<'a> TcFrameLayout<'a> {
    /// Splits `data` given the per-SA field widths. `has_fecf` comes from
    /// the managed parameter for this VC.
    #[allow(clippy::too_many_arguments)]
    pub fn parse(
        data: &'a [u8],
        has_segment_hdr: bool,
        security_header_len: usize,
        trailer_len: usize,
        has_fecf: bool,
    ) -> Result<Self, SdlsError> {
        if data.len() < PRIMARY_HEADER_LEN {
            return Err(SdlsError::NullBuffer);
        }
        let primary = TcPrimaryHeader::parse(data)?;
        let mut offset = PRIMARY_HEADER_LEN;

        let segment_header = if has_segment_hdr {
            let b = *data.get(offset).ok_or(SdlsError::NullBuffer)?;
            offset += SEGMENT_HEADER_LEN;
            Some(b)
        } else {
            None
        };

        if data.len() < offset + SPI_FIELD_LEN {
            return Err(SdlsError::SpiInvalid);
        }
        let spi = u16::from_be_bytes([data[offset], data[offset + 1]]);
        offset += SPI_FIELD_LEN;

        if data.len() < offset + security_header_len {
            return Err(SdlsError::NullBuffer);
        }
        let security_header = &data[offset..offset + security_header_len];
        offset += security_header_len;

        let fecf_start = data.len().checked_sub(if has_fecf { FECF_LEN } else { 0 }).ok_or(SdlsError::NullBuffer)?;
        let trailer_start = fecf_start.checked_sub(trailer_len).ok_or(SdlsError::NullBuffer)?;
        if trailer_start < offset {
            return Err(SdlsError::NullBuffer);
        }

        let payload = &data[offset..trailer_start];
        let trailer = &data[trailer_start..fecf_start];
        let fecf = if has_fecf {
            Some([data[fecf_start], data[fecf_start + 1]])
        } else {
            None
        };

        Ok(TcFrameLayout {
            primary,
            has_segment_hdr,
            segment_header,
            spi,
            security_header,
            payload,
            trailer,
            fecf,
        })
    }

    /// Bytes covered by the SDLS AAD range: primary header through end of
    /// security header, excluding the MAC region.
    pub fn aad_covered_len(&self) -> usize {
        PRIMARY_HEADER_LEN
            + if self.has_segment_hdr { SEGMENT_HEADER_LEN } else { 0 }
            + SPI_FIELD_LEN
            + self.security_header.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_header_round_trips() {
        let header = TcPrimaryHeader {
            tfvn: 0,
            bypass: false,
            control_command: true,
            scid: 0x123,
            vcid: 0x2A,
            frame_len: 0x1FF,
            fsn: 0x42,
        };
        let bytes = header.encode();
        let parsed = TcPrimaryHeader::parse(&bytes).unwrap();
        assert_eq!(header, parsed);
    }

    #[test]
    fn short_buffer_rejected() {
        assert!(TcPrimaryHeader::parse(&[0, 1, 2]).is_err());
    }
}
