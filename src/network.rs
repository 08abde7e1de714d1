//! Built-in network catalogue and construction parameters.

/// Network loaded when the caller names none.
pub const DEFAULT_NETWORK: &str = "aerial-fpv";

/// Built-in segmentation models known to the native library.
///
/// The discriminants match the native enumeration; `Custom` is the sentinel
/// the native resolver returns for names it does not recognise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum NetworkType {
    PascalVoc = 0,
    SynthiaCvpr16 = 1,
    SynthiaSummerHd = 2,
    SynthiaSummerSd = 3,
    CityscapesHd = 4,
    CityscapesSd = 5,
    AerialFpv = 6,
    Custom = 7,
}

impl NetworkType {
    pub const BUILT_IN: [NetworkType; 7] = [
        NetworkType::PascalVoc,
        NetworkType::SynthiaCvpr16,
        NetworkType::SynthiaSummerHd,
        NetworkType::SynthiaSummerSd,
        NetworkType::CityscapesHd,
        NetworkType::CityscapesSd,
        NetworkType::AerialFpv,
    ];

    /// Map a raw native value; anything out of range is `Custom`.
    pub fn from_raw(raw: i32) -> Self {
        Self::BUILT_IN
            .iter()
            .copied()
            .find(|ty| *ty as i32 == raw)
            .unwrap_or(NetworkType::Custom)
    }

    pub fn as_raw(self) -> i32 {
        self as i32
    }

    /// Short name accepted by `segNet(network=...)`.
    pub fn name(self) -> &'static str {
        match self {
            NetworkType::PascalVoc => "pascal-voc",
            NetworkType::SynthiaCvpr16 => "synthia-cvpr",
            NetworkType::SynthiaSummerHd => "synthia-summer-hd",
            NetworkType::SynthiaSummerSd => "synthia-summer-sd",
            NetworkType::CityscapesHd => "cityscapes-hd",
            NetworkType::CityscapesSd => "cityscapes-sd",
            NetworkType::AerialFpv => "aerial-fpv",
            NetworkType::Custom => "custom",
        }
    }

    /// Case-insensitive lookup; unknown names resolve to `Custom`.
    pub fn resolve(name: &str) -> Self {
        let lower = name.trim().to_ascii_lowercase();
        let short = lower.strip_prefix("fcn-alexnet-").unwrap_or(&lower);
        match short {
            "pascal-voc" => NetworkType::PascalVoc,
            "synthia-cvpr" | "synthia-cvpr16" => NetworkType::SynthiaCvpr16,
            "synthia-summer-hd" => NetworkType::SynthiaSummerHd,
            "synthia-summer-sd" => NetworkType::SynthiaSummerSd,
            "cityscapes-hd" => NetworkType::CityscapesHd,
            "cityscapes-sd" => NetworkType::CityscapesSd,
            "aerial-fpv" | "aerial-fpv-720p" => NetworkType::AerialFpv,
            _ => NetworkType::Custom,
        }
    }

    pub fn is_custom(self) -> bool {
        self == NetworkType::Custom
    }
}

/// Parameters of `segNet(network=..., argv=...)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstructParams {
    pub network: String,
    pub argv: Vec<String>,
}

impl Default for ConstructParams {
    fn default() -> Self {
        Self {
            network: DEFAULT_NETWORK.to_string(),
            argv: Vec::new(),
        }
    }
}

impl ConstructParams {
    pub fn builtin(network: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            argv: Vec::new(),
        }
    }

    pub fn from_argv<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Non-empty argv wins over the network name.
    pub fn uses_argv(&self) -> bool {
        !self.argv.is_empty()
    }
}

/// Where a loaded engine came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModelSource {
    BuiltIn(NetworkType),
    CommandLine(Vec<String>),
}

impl ModelSource {
    pub fn network_name(&self) -> &str {
        match self {
            ModelSource::BuiltIn(ty) => ty.name(),
            ModelSource::CommandLine(_) => NetworkType::Custom.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_short_and_long_names() {
        assert_eq!(NetworkType::resolve("aerial-fpv"), NetworkType::AerialFpv);
        assert_eq!(
            NetworkType::resolve("FCN-AlexNet-Aerial-FPV-720p"),
            NetworkType::AerialFpv
        );
        assert_eq!(
            NetworkType::resolve("fcn-alexnet-cityscapes-hd"),
            NetworkType::CityscapesHd
        );
        assert_eq!(NetworkType::resolve("resnet-18"), NetworkType::Custom);
        assert_eq!(NetworkType::resolve(""), NetworkType::Custom);
    }

    #[test]
    fn every_builtin_name_resolves_to_itself() {
        for ty in NetworkType::BUILT_IN {
            assert_eq!(NetworkType::resolve(ty.name()), ty);
            assert_eq!(NetworkType::from_raw(ty.as_raw()), ty);
        }
    }

    #[test]
    fn out_of_range_raw_values_are_custom() {
        assert_eq!(NetworkType::from_raw(7), NetworkType::Custom);
        assert_eq!(NetworkType::from_raw(-1), NetworkType::Custom);
        assert_eq!(NetworkType::from_raw(42), NetworkType::Custom);
    }

    #[test]
    fn default_params_use_builtin_network() {
        let params = ConstructParams::default();
        assert_eq!(params.network, DEFAULT_NETWORK);
        assert!(!params.uses_argv());
        assert!(ConstructParams::from_argv(["--model=custom.onnx"]).uses_argv());
    }

    #[test]
    fn command_line_source_reports_custom() {
        let source = ModelSource::CommandLine(vec!["--model=x.onnx".into()]);
        assert_eq!(source.network_name(), "custom");
        assert_eq!(
            ModelSource::BuiltIn(NetworkType::PascalVoc).network_name(),
            "pascal-voc"
        );
    }
}
