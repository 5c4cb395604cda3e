use std::io;

use bytes::Bytes;
use bytes_util::{BitReader, BitWriter, BytesCursorExt};

use crate::obu::seq::SequenceHeaderObu;

/// AV1 Codec Configuration Record
///
/// <https://aomediacodec.github.io/av1-isobmff/#av1codecconfigurationbox-syntax>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AV1CodecConfigurationRecord {
    /// `seq_profile` of the sequence header.
    ///
    /// 3 bits
    pub seq_profile: u8,
    /// `seq_level_idx[0]` of the sequence header.
    ///
    /// 5 bits
    pub seq_level_idx_0: u8,
    /// `seq_tier[0]` of the sequence header, 0 when it is not coded.
    ///
    /// 1 bit
    pub seq_tier_0: bool,
    /// `high_bitdepth` of the color config.
    ///
    /// 1 bit
    pub high_bitdepth: bool,
    /// `twelve_bit` of the color config, 0 when it is not coded.
    ///
    /// 1 bit
    pub twelve_bit: bool,
    /// `mono_chrome` of the color config.
    ///
    /// 1 bit
    pub monochrome: bool,
    /// `subsampling_x` of the color config.
    ///
    /// 1 bit
    pub chroma_subsampling_x: bool,
    /// `subsampling_y` of the color config.
    ///
    /// 1 bit
    pub chroma_subsampling_y: bool,
    /// `chroma_sample_position` of the color config, 0 (`CSP_UNKNOWN`) when it is not coded.
    ///
    /// 2 bits
    pub chroma_sample_position: u8,
    /// `initial_presentation_delay_minus_one`, if present.
    ///
    /// 4 bits
    pub initial_presentation_delay_minus_one: Option<u8>,
    /// Zero or more OBUs, normally exactly the sequence header OBU.
    pub config_obu: Bytes,
}

impl AV1CodecConfigurationRecord {
    /// Builds the record that describes `seq`.
    ///
    /// `config_obu` should hold the complete encoded sequence header OBU.
    pub fn from_sequence_header(seq: &SequenceHeaderObu, config_obu: Bytes) -> Self {
        let color = &seq.color_config;
        Self {
            seq_profile: seq.seq_profile,
            seq_level_idx_0: seq.seq_level_idx_0(),
            seq_tier_0: seq.seq_tier_0(),
            high_bitdepth: color.high_bitdepth,
            twelve_bit: color.twelve_bit,
            monochrome: color.mono_chrome,
            chroma_subsampling_x: color.subsampling_x,
            chroma_subsampling_y: color.subsampling_y,
            chroma_sample_position: color.chroma_sample_position.unwrap_or(0),
            initial_presentation_delay_minus_one: None,
            config_obu,
        }
    }

    /// Demuxes the record from the given reader.
    pub fn demux(reader: &mut io::Cursor<Bytes>) -> io::Result<Self> {
        let mut bit_reader = BitReader::new(reader);

        let marker = bit_reader.read_bit()?;
        if !marker {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "marker is not set",
            ));
        }

        let version = bit_reader.read_bits(7)? as u8;
        if version != 1 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "version is not 1",
            ));
        }

        let seq_profile = bit_reader.read_bits(3)? as u8;
        let seq_level_idx_0 = bit_reader.read_bits(5)? as u8;

        let seq_tier_0 = bit_reader.read_bit()?;
        let high_bitdepth = bit_reader.read_bit()?;
        let twelve_bit = bit_reader.read_bit()?;
        let monochrome = bit_reader.read_bit()?;
        let chroma_subsampling_x = bit_reader.read_bit()?;
        let chroma_subsampling_y = bit_reader.read_bit()?;
        let chroma_sample_position = bit_reader.read_bits(2)? as u8;

        bit_reader.seek_bits(3)?; // reserved 3 bits

        let initial_presentation_delay_minus_one = if bit_reader.read_bit()? {
            Some(bit_reader.read_bits(4)? as u8)
        } else {
            bit_reader.seek_bits(4)?; // reserved 4 bits
            None
        };

        let reader = bit_reader.into_inner();

        Ok(AV1CodecConfigurationRecord {
            seq_profile,
            seq_level_idx_0,
            seq_tier_0,
            high_bitdepth,
            twelve_bit,
            monochrome,
            chroma_subsampling_x,
            chroma_subsampling_y,
            chroma_sample_position,
            initial_presentation_delay_minus_one,
            config_obu: reader.extract_remaining(),
        })
    }

    /// Returns the size of the record in bytes.
    pub fn size(&self) -> u64 {
        1 // marker, version
        + 1 // seq_profile, seq_level_idx_0
        + 1 // seq_tier_0 .. chroma_sample_position
        + 1 // reserved, initial_presentation_delay
        + self.config_obu.len() as u64
    }

    /// Muxes the record to the given writer.
    pub fn mux<T: io::Write>(&self, writer: &mut T) -> io::Result<()> {
        let mut bit_writer = BitWriter::new(writer);

        bit_writer.write_bit(true)?; // marker
        bit_writer.write_bits(1, 7)?; // version

        bit_writer.write_bits(self.seq_profile as u64, 3)?;
        bit_writer.write_bits(self.seq_level_idx_0 as u64, 5)?;

        bit_writer.write_bit(self.seq_tier_0)?;
        bit_writer.write_bit(self.high_bitdepth)?;
        bit_writer.write_bit(self.twelve_bit)?;
        bit_writer.write_bit(self.monochrome)?;
        bit_writer.write_bit(self.chroma_subsampling_x)?;
        bit_writer.write_bit(self.chroma_subsampling_y)?;
        bit_writer.write_bits(self.chroma_sample_position as u64, 2)?;

        bit_writer.write_bits(0, 3)?; // reserved 3 bits

        if let Some(initial_presentation_delay_minus_one) =
            self.initial_presentation_delay_minus_one
        {
            bit_writer.write_bit(true)?;
            bit_writer.write_bits(initial_presentation_delay_minus_one as u64, 4)?;
        } else {
            bit_writer.write_bit(false)?;
            bit_writer.write_bits(0, 4)?; // reserved 4 bits
        }

        bit_writer.finish()?.write_all(&self.config_obu)?;

        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;
    use crate::parse_obus;

    const SEQ_HEADER_OBU: &[u8] = b"\n\x0f\0\0\0j\xef\xbf\xe1\xbc\x02\x19\x90\x10\x10\x10@";

    #[test]
    fn test_from_sequence_header() {
        let stream = parse_obus(Bytes::from_static(SEQ_HEADER_OBU)).unwrap();
        let seq = stream.sequence_header().unwrap();

        let config = AV1CodecConfigurationRecord::from_sequence_header(
            seq,
            stream.bytes_of(&stream.records()[0]),
        );
        insta::assert_debug_snapshot!(config, @r#"
        AV1CodecConfigurationRecord {
            seq_profile: 0,
            seq_level_idx_0: 13,
            seq_tier_0: false,
            high_bitdepth: false,
            twelve_bit: false,
            monochrome: false,
            chroma_subsampling_x: true,
            chroma_subsampling_y: true,
            chroma_sample_position: 0,
            initial_presentation_delay_minus_one: None,
            config_obu: b"\n\x0f\0\0\0j\xef\xbf\xe1\xbc\x02\x19\x90\x10\x10\x10@",
        }
        "#);

        let mut buf = Vec::new();
        config.mux(&mut buf).unwrap();
        assert_eq!(buf.len() as u64, config.size());
        assert_eq!(&buf[..4], b"\x81\r\x0c\0");
        assert_eq!(&buf[4..], SEQ_HEADER_OBU);
    }

    #[test]
    fn test_config_demux() {
        let data = b"\x81\r\x0c\0\n\x0f\0\0\0j\xef\xbf\xe1\xbc\x02\x19\x90\x10\x10\x10@".to_vec();

        let config = AV1CodecConfigurationRecord::demux(&mut io::Cursor::new(data.into())).unwrap();
        assert_eq!(config.seq_level_idx_0, 13);
        assert!(config.chroma_subsampling_x && config.chroma_subsampling_y);
        assert_eq!(config.initial_presentation_delay_minus_one, None);
        assert_eq!(config.config_obu.as_ref(), SEQ_HEADER_OBU);
    }

    #[test]
    fn test_config_demux_with_initial_presentation_delay() {
        let data = b"\x81\r\x0c\x3f".to_vec();

        let config = AV1CodecConfigurationRecord::demux(&mut io::Cursor::new(data.into())).unwrap();
        assert_eq!(config.initial_presentation_delay_minus_one, Some(15));
        assert!(config.config_obu.is_empty());
    }

    #[test]
    fn test_marker_is_not_set() {
        let data = vec![0b00000000];

        let err =
            AV1CodecConfigurationRecord::demux(&mut io::Cursor::new(data.into())).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert_eq!(err.to_string(), "marker is not set");
    }

    #[test]
    fn test_version_is_not_1() {
        let data = vec![0b10000000];

        let err =
            AV1CodecConfigurationRecord::demux(&mut io::Cursor::new(data.into())).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert_eq!(err.to_string(), "version is not 1");
    }

    #[test]
    fn test_config_mux_with_delay() {
        let config = AV1CodecConfigurationRecord {
            seq_profile: 1,
            seq_level_idx_0: 16,
            seq_tier_0: true,
            high_bitdepth: true,
            twelve_bit: false,
            monochrome: false,
            chroma_subsampling_x: false,
            chroma_subsampling_y: false,
            chroma_sample_position: 0,
            initial_presentation_delay_minus_one: Some(0),
            config_obu: Bytes::from_static(b"OBU"),
        };

        let mut buf = Vec::new();
        config.mux(&mut buf).unwrap();

        insta::assert_snapshot!(format!("{:?}", Bytes::from(buf)), @r#"b"\x810\xc0\x10OBU""#);
    }
}
