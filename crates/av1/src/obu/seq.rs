//! Sequence Header

use std::io;

use byteorder::{BigEndian, ReadBytesExt};
use bytes_util::BitReader;

use super::ObuHeader;
use crate::obu::utils::read_uvlc;

/// `CP_BT_709`
const CP_BT_709: u8 = 1;
/// `TC_SRGB`
const TC_SRGB: u8 = 13;
/// `MC_IDENTITY`
const MC_IDENTITY: u8 = 0;
/// `SELECT_SCREEN_CONTENT_TOOLS`
const SELECT_SCREEN_CONTENT_TOOLS: u8 = 2;
/// `SELECT_INTEGER_MV`
const SELECT_INTEGER_MV: u8 = 2;

/// Sequence Header OBU
///
/// AV1-Spec-2 - 5.5
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceHeaderObu {
    /// The OBU header that precedes the sequence header
    pub header: ObuHeader,
    /// `seq_profile`
    ///
    /// 3 bits
    pub seq_profile: u8,
    /// `still_picture`
    ///
    /// 1 bit
    pub still_picture: bool,
    /// `reduced_still_picture_header`
    ///
    /// 1 bit
    pub reduced_still_picture_header: bool,
    /// `timing_info` if `reduced_still_picture_header` is 0 and `timing_info_present_flag` is 1
    pub timing_info: Option<TimingInfo>,
    /// `decoder_model_info` if `timing_info` is present and `decoder_model_info_present_flag` is 1
    pub decoder_model_info: Option<DecoderModelInfo>,
    /// All operating points. Always holds at least one entry.
    pub operating_points: Vec<OperatingPoint>,
    /// `max_frame_width_minus_1 + 1`
    pub max_frame_width: u32,
    /// `max_frame_height_minus_1 + 1`
    pub max_frame_height: u32,
    /// The [`FrameIds`] if `frame_id_numbers_present_flag` is 1
    pub frame_ids: Option<FrameIds>,
    /// `use_128x128_superblock`
    pub use_128x128_superblock: bool,
    /// `enable_filter_intra`
    pub enable_filter_intra: bool,
    /// `enable_intra_edge_filter`
    pub enable_intra_edge_filter: bool,
    /// `enable_interintra_compound`
    pub enable_interintra_compound: bool,
    /// `enable_masked_compound`
    pub enable_masked_compound: bool,
    /// `enable_warped_motion`
    pub enable_warped_motion: bool,
    /// `enable_dual_filter`
    pub enable_dual_filter: bool,
    /// `enable_order_hint`
    pub enable_order_hint: bool,
    /// `enable_jnt_comp`
    pub enable_jnt_comp: bool,
    /// `enable_ref_frame_mvs`
    pub enable_ref_frame_mvs: bool,
    /// `seq_force_screen_content_tools`, 2 meaning "select per frame"
    pub seq_force_screen_content_tools: u8,
    /// `seq_force_integer_mv`, 2 meaning "select per frame"
    pub seq_force_integer_mv: u8,
    /// `OrderHintBits`
    pub order_hint_bits: u8,
    /// `enable_superres`
    pub enable_superres: bool,
    /// `enable_cdef`
    pub enable_cdef: bool,
    /// `enable_restoration`
    pub enable_restoration: bool,
    /// `color_config()`
    pub color_config: ColorConfig,
    /// `film_grain_params_present`
    pub film_grain_params_present: bool,
}

/// Frame IDs
///
/// Can be part of the [`SequenceHeaderObu`].
#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub struct FrameIds {
    /// `delta_frame_id_length_minus_2 + 2`
    ///
    /// 4 bits
    pub delta_frame_id_length: u8,
    /// `additional_frame_id_length_minus_1 + 1`
    ///
    /// 3 bits
    pub additional_frame_id_length: u8,
}

/// Operating Point
///
/// Part of the [`SequenceHeaderObu`].
#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub struct OperatingPoint {
    /// `operating_point_idc`
    ///
    /// 12 bits
    pub idc: u16,
    /// `seq_level_idx`
    ///
    /// 5 bits
    pub seq_level_idx: u8,
    /// `seq_tier`, only coded when `seq_level_idx > 7`
    ///
    /// 1 bit
    pub seq_tier: bool,
    /// `operating_parameters_info` if `decoder_model_present_for_this_op` is 1
    pub operating_parameters_info: Option<OperatingParametersInfo>,
    /// `initial_display_delay_minus_1 + 1` if signaled for this operating point
    ///
    /// 4 bits
    pub initial_display_delay: Option<u8>,
}

/// Timing info
///
/// AV1-Spec-2 - 5.5.3
#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub struct TimingInfo {
    /// `num_units_in_display_tick`
    ///
    /// 32 bits
    pub num_units_in_display_tick: u32,
    /// `time_scale`
    ///
    /// 32 bits
    pub time_scale: u32,
    /// `num_ticks_per_picture_minus_1 + 1` if `equal_picture_interval` is 1
    ///
    /// uvlc()
    pub num_ticks_per_picture: Option<u64>,
}

impl TimingInfo {
    /// Parses the timing info from the given reader.
    pub fn parse(bit_reader: &mut BitReader<impl io::Read>) -> io::Result<Self> {
        let num_units_in_display_tick = bit_reader.read_u32::<BigEndian>()?;
        let time_scale = bit_reader.read_u32::<BigEndian>()?;
        let num_ticks_per_picture = if bit_reader.read_bit()? {
            Some(read_uvlc(bit_reader)? + 1)
        } else {
            None
        };

        Ok(Self {
            num_units_in_display_tick,
            time_scale,
            num_ticks_per_picture,
        })
    }
}

/// Decoder model info
///
/// AV1-Spec-2 - 5.5.4
#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub struct DecoderModelInfo {
    /// `buffer_delay_length_minus_1 + 1`
    ///
    /// 5 bits
    pub buffer_delay_length: u8,
    /// `num_units_in_decoding_tick`
    ///
    /// 32 bits
    pub num_units_in_decoding_tick: u32,
    /// `buffer_removal_time_length_minus_1 + 1`
    ///
    /// 5 bits
    pub buffer_removal_time_length: u8,
    /// `frame_presentation_time_length_minus_1 + 1`
    ///
    /// 5 bits
    pub frame_presentation_time_length: u8,
}

impl DecoderModelInfo {
    /// Parses the decoder model info from the given reader.
    pub fn parse(bit_reader: &mut BitReader<impl io::Read>) -> io::Result<Self> {
        let buffer_delay_length = bit_reader.read_bits(5)? as u8 + 1;
        let num_units_in_decoding_tick = bit_reader.read_u32::<BigEndian>()?;
        let buffer_removal_time_length = bit_reader.read_bits(5)? as u8 + 1;
        let frame_presentation_time_length = bit_reader.read_bits(5)? as u8 + 1;

        Ok(Self {
            buffer_delay_length,
            num_units_in_decoding_tick,
            buffer_removal_time_length,
            frame_presentation_time_length,
        })
    }
}

/// Operating parameters info
///
/// AV1-Spec-2 - 5.5.5
#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub struct OperatingParametersInfo {
    /// `decoder_buffer_delay`
    pub decoder_buffer_delay: u64,
    /// `encoder_buffer_delay`
    pub encoder_buffer_delay: u64,
    /// `low_delay_mode_flag`
    pub low_delay_mode_flag: bool,
}

impl OperatingParametersInfo {
    /// Parses the operating parameters info; both delays are `delay_bit_length` bits wide.
    pub fn parse(
        delay_bit_length: u8,
        bit_reader: &mut BitReader<impl io::Read>,
    ) -> io::Result<Self> {
        let decoder_buffer_delay = bit_reader.read_bits(delay_bit_length)?;
        let encoder_buffer_delay = bit_reader.read_bits(delay_bit_length)?;
        let low_delay_mode_flag = bit_reader.read_bit()?;

        Ok(Self {
            decoder_buffer_delay,
            encoder_buffer_delay,
            low_delay_mode_flag,
        })
    }
}

/// Color config
///
/// AV1-Spec-2 - 5.5.2
///
/// The color description and chroma sample position are `None` when the
/// bitstream does not signal them.
#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub struct ColorConfig {
    /// `high_bitdepth`
    pub high_bitdepth: bool,
    /// `twelve_bit`, only coded for profile 2 with `high_bitdepth`
    pub twelve_bit: bool,
    /// `mono_chrome`
    pub mono_chrome: bool,
    /// `color_primaries`
    ///
    /// 8 bits
    pub color_primaries: Option<u8>,
    /// `transfer_characteristics`
    ///
    /// 8 bits
    pub transfer_characteristics: Option<u8>,
    /// `matrix_coefficients`
    ///
    /// 8 bits
    pub matrix_coefficients: Option<u8>,
    /// `color_range`
    pub full_color_range: bool,
    /// `subsampling_x`
    pub subsampling_x: bool,
    /// `subsampling_y`
    pub subsampling_y: bool,
    /// `chroma_sample_position`
    ///
    /// 2 bits
    pub chroma_sample_position: Option<u8>,
    /// `separate_uv_delta_q`
    pub separate_uv_delta_q: bool,
}

impl ColorConfig {
    /// `BitDepth`
    pub const fn bit_depth(&self) -> u8 {
        match (self.high_bitdepth, self.twelve_bit) {
            (true, true) => 12,
            (true, false) => 10,
            (false, _) => 8,
        }
    }

    /// `NumPlanes`
    pub const fn num_planes(&self) -> u8 {
        if self.mono_chrome { 1 } else { 3 }
    }

    /// Returns `(color_primaries, transfer_characteristics, matrix_coefficients)`
    /// when the color description was signaled.
    pub fn color_description(&self) -> Option<(u8, u8, u8)> {
        Some((
            self.color_primaries?,
            self.transfer_characteristics?,
            self.matrix_coefficients?,
        ))
    }

    /// Parses the color config from the given reader.
    pub fn parse(seq_profile: u8, bit_reader: &mut BitReader<impl io::Read>) -> io::Result<Self> {
        let high_bitdepth = bit_reader.read_bit()?;
        let twelve_bit = if seq_profile == 2 && high_bitdepth {
            bit_reader.read_bit()?
        } else {
            false
        };

        let mono_chrome = if seq_profile == 1 {
            false
        } else {
            bit_reader.read_bit()?
        };

        let color_description_present_flag = bit_reader.read_bit()?;
        let (color_primaries, transfer_characteristics, matrix_coefficients) =
            if color_description_present_flag {
                (
                    Some(bit_reader.read_bits(8)? as u8),
                    Some(bit_reader.read_bits(8)? as u8),
                    Some(bit_reader.read_bits(8)? as u8),
                )
            } else {
                (None, None, None)
            };

        if mono_chrome {
            return Ok(ColorConfig {
                high_bitdepth,
                twelve_bit,
                mono_chrome,
                color_primaries,
                transfer_characteristics,
                matrix_coefficients,
                full_color_range: bit_reader.read_bit()?,
                subsampling_x: true,
                subsampling_y: true,
                chroma_sample_position: None,
                separate_uv_delta_q: false,
            });
        }

        let is_srgb_identity = color_primaries == Some(CP_BT_709)
            && transfer_characteristics == Some(TC_SRGB)
            && matrix_coefficients == Some(MC_IDENTITY);

        let (full_color_range, subsampling_x, subsampling_y) = if is_srgb_identity {
            (true, false, false)
        } else {
            let color_range = bit_reader.read_bit()?;
            let (subsampling_x, subsampling_y) = match seq_profile {
                0 => (true, true),
                1 => (false, false),
                _ if high_bitdepth && twelve_bit => {
                    let subsampling_x = bit_reader.read_bit()?;
                    let subsampling_y = if subsampling_x {
                        bit_reader.read_bit()?
                    } else {
                        false
                    };
                    (subsampling_x, subsampling_y)
                }
                _ => (true, false),
            };
            (color_range, subsampling_x, subsampling_y)
        };

        let chroma_sample_position = if subsampling_x && subsampling_y {
            Some(bit_reader.read_bits(2)? as u8)
        } else {
            None
        };

        Ok(ColorConfig {
            high_bitdepth,
            twelve_bit,
            mono_chrome,
            color_primaries,
            transfer_characteristics,
            matrix_coefficients,
            full_color_range,
            subsampling_x,
            subsampling_y,
            chroma_sample_position,
            separate_uv_delta_q: bit_reader.read_bit()?,
        })
    }
}

impl SequenceHeaderObu {
    /// Returns a reference to the header of the OBU.
    pub const fn header(&self) -> &ObuHeader {
        &self.header
    }

    /// `seq_level_idx[0]`
    pub fn seq_level_idx_0(&self) -> u8 {
        self.operating_points
            .first()
            .map_or(0, |op| op.seq_level_idx)
    }

    /// `seq_tier[0]`
    pub fn seq_tier_0(&self) -> bool {
        self.operating_points.first().is_some_and(|op| op.seq_tier)
    }

    /// Parses the sequence header payload from the given reader.
    ///
    /// `header` is the already parsed OBU header; it is kept in the returned
    /// struct and can be accessed through [`SequenceHeaderObu::header`].
    /// Trailing bits after `film_grain_params_present` are not consumed.
    pub fn parse(header: ObuHeader, reader: &mut impl io::Read) -> io::Result<Self> {
        let mut bit_reader = BitReader::new(reader);

        let seq_profile = bit_reader.read_bits(3)? as u8;
        let still_picture = bit_reader.read_bit()?;
        let reduced_still_picture_header = bit_reader.read_bit()?;

        if !still_picture && reduced_still_picture_header {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "reduced_still_picture_header is set but still_picture is not",
            ));
        }

        let mut timing_info = None;
        let mut decoder_model_info = None;
        let mut operating_points = Vec::new();

        if reduced_still_picture_header {
            operating_points.push(OperatingPoint {
                idc: 0,
                seq_level_idx: bit_reader.read_bits(5)? as u8,
                seq_tier: false,
                operating_parameters_info: None,
                initial_display_delay: None,
            });
        } else {
            if bit_reader.read_bit()? {
                // timing_info_present_flag
                timing_info = Some(TimingInfo::parse(&mut bit_reader)?);
                if bit_reader.read_bit()? {
                    // decoder_model_info_present_flag
                    decoder_model_info = Some(DecoderModelInfo::parse(&mut bit_reader)?);
                }
            }

            let initial_display_delay_present_flag = bit_reader.read_bit()?;
            let operating_points_cnt = bit_reader.read_bits(5)? as usize + 1;
            operating_points.reserve(operating_points_cnt);

            for _ in 0..operating_points_cnt {
                let idc = bit_reader.read_bits(12)? as u16;
                let seq_level_idx = bit_reader.read_bits(5)? as u8;
                let seq_tier = seq_level_idx > 7 && bit_reader.read_bit()?;

                let operating_parameters_info = match decoder_model_info {
                    // decoder_model_present_for_this_op
                    Some(info) if bit_reader.read_bit()? => Some(OperatingParametersInfo::parse(
                        info.buffer_delay_length,
                        &mut bit_reader,
                    )?),
                    _ => None,
                };

                // initial_display_delay_present_for_this_op
                let initial_display_delay =
                    if initial_display_delay_present_flag && bit_reader.read_bit()? {
                        Some(bit_reader.read_bits(4)? as u8 + 1)
                    } else {
                        None
                    };

                operating_points.push(OperatingPoint {
                    idc,
                    seq_level_idx,
                    seq_tier,
                    operating_parameters_info,
                    initial_display_delay,
                });
            }
        }

        let frame_width_bits = bit_reader.read_bits(4)? as u8 + 1;
        let frame_height_bits = bit_reader.read_bits(4)? as u8 + 1;
        let max_frame_width = bit_reader.read_bits(frame_width_bits)? as u32 + 1;
        let max_frame_height = bit_reader.read_bits(frame_height_bits)? as u32 + 1;

        // frame_id_numbers_present_flag
        let frame_ids = if !reduced_still_picture_header && bit_reader.read_bit()? {
            Some(FrameIds {
                delta_frame_id_length: bit_reader.read_bits(4)? as u8 + 2,
                additional_frame_id_length: bit_reader.read_bits(3)? as u8 + 1,
            })
        } else {
            None
        };

        let use_128x128_superblock = bit_reader.read_bit()?;
        let enable_filter_intra = bit_reader.read_bit()?;
        let enable_intra_edge_filter = bit_reader.read_bit()?;

        let mut enable_interintra_compound = false;
        let mut enable_masked_compound = false;
        let mut enable_warped_motion = false;
        let mut enable_dual_filter = false;
        let mut enable_order_hint = false;
        let mut enable_jnt_comp = false;
        let mut enable_ref_frame_mvs = false;
        let mut seq_force_screen_content_tools = SELECT_SCREEN_CONTENT_TOOLS;
        let mut seq_force_integer_mv = SELECT_INTEGER_MV;
        let mut order_hint_bits = 0;

        if !reduced_still_picture_header {
            enable_interintra_compound = bit_reader.read_bit()?;
            enable_masked_compound = bit_reader.read_bit()?;
            enable_warped_motion = bit_reader.read_bit()?;
            enable_dual_filter = bit_reader.read_bit()?;
            enable_order_hint = bit_reader.read_bit()?;
            if enable_order_hint {
                enable_jnt_comp = bit_reader.read_bit()?;
                enable_ref_frame_mvs = bit_reader.read_bit()?;
            }

            // seq_choose_screen_content_tools
            if !bit_reader.read_bit()? {
                seq_force_screen_content_tools = bit_reader.read_bits(1)? as u8;
            }

            // seq_choose_integer_mv, only coded when screen content tools may be on
            if seq_force_screen_content_tools > 0 && !bit_reader.read_bit()? {
                seq_force_integer_mv = bit_reader.read_bits(1)? as u8;
            }

            if enable_order_hint {
                order_hint_bits = bit_reader.read_bits(3)? as u8 + 1;
            }
        }

        let enable_superres = bit_reader.read_bit()?;
        let enable_cdef = bit_reader.read_bit()?;
        let enable_restoration = bit_reader.read_bit()?;

        let color_config = ColorConfig::parse(seq_profile, &mut bit_reader)?;
        let film_grain_params_present = bit_reader.read_bit()?;

        Ok(Self {
            header,
            seq_profile,
            still_picture,
            reduced_still_picture_header,
            timing_info,
            decoder_model_info,
            operating_points,
            max_frame_width,
            max_frame_height,
            frame_ids,
            use_128x128_superblock,
            enable_filter_intra,
            enable_intra_edge_filter,
            enable_interintra_compound,
            enable_masked_compound,
            enable_warped_motion,
            enable_dual_filter,
            enable_order_hint,
            enable_jnt_comp,
            enable_ref_frame_mvs,
            seq_force_screen_content_tools,
            seq_force_integer_mv,
            order_hint_bits,
            enable_superres,
            enable_cdef,
            enable_restoration,
            color_config,
            film_grain_params_present,
        })
    }
}
