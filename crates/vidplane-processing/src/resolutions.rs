/// One rung of the transcode ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionSpec {
    pub label: &'static str,
    pub width: u32,
    pub height: u32,
    pub bitrate_kbps: u32,
}

/// The fixed output ladder. Every video is transcoded to every rung;
/// plans do not alter what the pipeline produces.
pub const RESOLUTION_LADDER: &[ResolutionSpec] = &[
    ResolutionSpec {
        label: "720p",
        width: 1280,
        height: 720,
        bitrate_kbps: 2500,
    },
    ResolutionSpec {
        label: "1080p",
        width: 1920,
        height: 1080,
        bitrate_kbps: 5000,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ladder_has_both_rungs_in_order() {
        assert_eq!(RESOLUTION_LADDER.len(), 2);
        assert_eq!(RESOLUTION_LADDER[0].label, "720p");
        assert_eq!((RESOLUTION_LADDER[0].width, RESOLUTION_LADDER[0].height), (1280, 720));
        assert_eq!(RESOLUTION_LADDER[0].bitrate_kbps, 2500);
        assert_eq!(RESOLUTION_LADDER[1].label, "1080p");
        assert_eq!((RESOLUTION_LADDER[1].width, RESOLUTION_LADDER[1].height), (1920, 1080));
        assert_eq!(RESOLUTION_LADDER[1].bitrate_kbps, 5000);
    }
}
