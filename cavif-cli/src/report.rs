use av1::seq::SequenceHeaderObu;
use avif::dump::list_boxes;

fn yes_no(value: bool) -> &'static str {
    if value { "Yes" } else { "No" }
}

fn or_unknown(value: Option<u8>) -> String {
    value.map_or_else(|| "<Unknown>".to_string(), |v| v.to_string())
}

/// Human readable summary of a sequence header.
pub fn sequence_header_report(seq: &SequenceHeaderObu) -> String {
    let color = &seq.color_config;

    let lines = [
        "<Encoding Result>".to_string(),
        " - OBU Sequence Header:".to_string(),
        format!("   - AV1 Profile: {}", seq.seq_profile),
        format!("   - Still picture: {}", yes_no(seq.still_picture)),
        format!(
            "   - Reduced still picture header: {}",
            yes_no(seq.reduced_still_picture_header)
        ),
        format!(
            "   - Sequence Level Index at OperatingPoint[0]: {}",
            seq.seq_level_idx_0()
        ),
        format!("   - Max frame width: {}", seq.max_frame_width),
        format!("   - Max frame height: {}", seq.max_frame_height),
        format!(
            "   - Use 128x128 superblock: {}",
            yes_no(seq.use_128x128_superblock)
        ),
        format!("   - FilterIntra enabled: {}", yes_no(seq.enable_filter_intra)),
        format!(
            "   - IntraEdgeFilter enabled: {}",
            yes_no(seq.enable_intra_edge_filter)
        ),
        format!(
            "   - InterIntraCompound enabled: {}",
            yes_no(seq.enable_interintra_compound)
        ),
        format!(
            "   - Masked Compound enabled: {}",
            yes_no(seq.enable_masked_compound)
        ),
        format!("   - WarpedMotion enabled: {}", yes_no(seq.enable_warped_motion)),
        format!("   - DualFilter enabled: {}", yes_no(seq.enable_dual_filter)),
        format!("   - OrderHint enabled: {}", yes_no(seq.enable_order_hint)),
        format!("   - JNTComp enabled: {}", yes_no(seq.enable_jnt_comp)),
        format!("   - RefFrameMVS enabled: {}", yes_no(seq.enable_ref_frame_mvs)),
        format!("   - Superres enabled: {}", yes_no(seq.enable_superres)),
        format!("   - CDEF enabled: {}", yes_no(seq.enable_cdef)),
        format!(
            "   - Loop Restoration enabled: {}",
            yes_no(seq.enable_restoration)
        ),
        format!(
            "   - Film Grain Params Present: {}",
            yes_no(seq.film_grain_params_present)
        ),
        "   - Color Info:".to_string(),
        format!("     - High bit-depth: {}", yes_no(color.high_bitdepth)),
        format!("     - Twelve bit: {}", yes_no(color.twelve_bit)),
        format!("     - Monochrome: {}", yes_no(color.mono_chrome)),
        format!("     - Color primaries: {}", or_unknown(color.color_primaries)),
        format!(
            "     - Transfer characteristics: {}",
            or_unknown(color.transfer_characteristics)
        ),
        format!(
            "     - Matrix coefficients: {}",
            or_unknown(color.matrix_coefficients)
        ),
        format!(
            "     - Color range: {}",
            if color.full_color_range {
                "Full Ranged"
            } else {
                "Limited"
            }
        ),
        format!("     - Sub sampling X: {}", u8::from(color.subsampling_x)),
        format!("     - Sub sampling Y: {}", u8::from(color.subsampling_y)),
        format!(
            "     - Chroma sample position: {}",
            or_unknown(color.chroma_sample_position)
        ),
        format!(
            "     - Separate UV Delta Q: {}",
            yes_no(color.separate_uv_delta_q)
        ),
    ];

    lines.join("\n") + "\n"
}

/// One line per box, indented by depth.
pub fn box_tree(data: &[u8]) -> String {
    list_boxes(data)
        .iter()
        .map(|b| format!("{b}\n"))
        .collect()
}

#[cfg(test)]
#[cfg_attr(all(coverage_nightly, test), coverage(off))]
mod tests {
    use av1::parse_obus;
    use avif::test_support::SEQ_HEADER_OBU;
    use bytes::Bytes;

    use super::*;

    #[test]
    fn test_sequence_header_report() {
        let stream = parse_obus(Bytes::from_static(SEQ_HEADER_OBU)).unwrap();
        let report = sequence_header_report(stream.sequence_header().unwrap());

        insta::assert_snapshot!(report, @r"
        <Encoding Result>
         - OBU Sequence Header:
           - AV1 Profile: 0
           - Still picture: No
           - Reduced still picture header: No
           - Sequence Level Index at OperatingPoint[0]: 13
           - Max frame width: 3840
           - Max frame height: 2160
           - Use 128x128 superblock: No
           - FilterIntra enabled: No
           - IntraEdgeFilter enabled: No
           - InterIntraCompound enabled: No
           - Masked Compound enabled: No
           - WarpedMotion enabled: No
           - DualFilter enabled: No
           - OrderHint enabled: Yes
           - JNTComp enabled: No
           - RefFrameMVS enabled: No
           - Superres enabled: No
           - CDEF enabled: Yes
           - Loop Restoration enabled: Yes
           - Film Grain Params Present: No
           - Color Info:
             - High bit-depth: No
             - Twelve bit: No
             - Monochrome: No
             - Color primaries: 1
             - Transfer characteristics: 1
             - Matrix coefficients: 1
             - Color range: Limited
             - Sub sampling X: 1
             - Sub sampling Y: 1
             - Chroma sample position: 0
             - Separate UV Delta Q: No
        ");
    }

    #[test]
    fn test_unknown_color_description() {
        let mut seq = parse_obus(Bytes::from_static(SEQ_HEADER_OBU))
            .unwrap()
            .sequence_header()
            .unwrap()
            .clone();
        seq.color_config.color_primaries = None;
        seq.color_config.chroma_sample_position = None;

        let report = sequence_header_report(&seq);
        assert!(report.contains("     - Color primaries: <Unknown>\n"));
        assert!(report.contains("     - Chroma sample position: <Unknown>\n"));
        assert!(report.contains("     - Transfer characteristics: 1\n"));
    }

    #[test]
    fn test_box_tree() {
        let mut data = avif::test_support::make_box(b"ftyp", b"avif\0\0\0\0");
        data.extend_from_slice(&avif::test_support::make_box(b"mdat", &[1, 2]));
        insta::assert_snapshot!(box_tree(&data), @r"
        ftyp @0 size=16
        mdat @16 size=10
        ");
    }
}
