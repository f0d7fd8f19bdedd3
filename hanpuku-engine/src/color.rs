use hanpuku_core::document::CanonicalColor;
use hanpuku_core::host::HostColor;
use tracing::warn;

/// 不支持的颜色模型统一回退为黑色。
pub const FALLBACK_COLOR: CanonicalColor = CanonicalColor::Rgb {
    red: 0.0,
    green: 0.0,
    blue: 0.0,
};

/// 近似的 CMYK → RGB 换算，不做色彩管理。
#[inline]
pub fn cmyk_channel(channel: f64, black: f64) -> f64 {
    (0.0255 * (100.0 - channel) * (100.0 - black)).floor()
}

/// 颜色归一化器。“已警告”状态属于单次提取运行，同一次运行只输出一条诊断。
#[derive(Debug, Clone)]
pub struct ColorNormalizer {
    warned: bool,
    diagnostics: Vec<String>,
}

impl ColorNormalizer {
    pub fn new(warn_unsupported: bool) -> Self {
        Self {
            warned: !warn_unsupported,
            diagnostics: Vec::new(),
        }
    }

    pub fn normalize(&mut self, color: &HostColor) -> CanonicalColor {
        match color {
            HostColor::Rgb { red, green, blue } => CanonicalColor::rgb(*red, *green, *blue),
            HostColor::Gray { gray } => CanonicalColor::rgb(*gray, *gray, *gray),
            HostColor::Cmyk {
                cyan,
                magenta,
                yellow,
                black,
            } => CanonicalColor::rgb(
                cmyk_channel(*cyan, *black),
                cmyk_channel(*magenta, *black),
                cmyk_channel(*yellow, *black),
            ),
            HostColor::NoColor => CanonicalColor::None,
            HostColor::Other { typename } => {
                if !self.warned {
                    warn!(typename = %typename, "不支持的颜色模型，使用黑色代替");
                    self.diagnostics
                        .push(format!("hanpuku does not yet support {typename}"));
                    self.warned = true;
                }
                FALLBACK_COLOR
            }
        }
    }

    #[inline]
    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    /// 取出累计的诊断信息，警告状态保持不变。
    pub fn take_diagnostics(&mut self) -> Vec<String> {
        std::mem::take(&mut self.diagnostics)
    }
}

impl Default for ColorNormalizer {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn other(typename: &str) -> HostColor {
        HostColor::Other {
            typename: typename.to_string(),
        }
    }

    #[test]
    fn rgb_and_gray_map_directly() {
        let mut colors = ColorNormalizer::default();
        let red = colors.normalize(&HostColor::Rgb {
            red: 255.0,
            green: 0.0,
            blue: 0.0,
        });
        assert_eq!(red.to_string(), "rgb(255,0,0)");
        let gray = colors.normalize(&HostColor::Gray { gray: 128.0 });
        assert_eq!(gray.to_string(), "rgb(128,128,128)");
        assert_eq!(colors.normalize(&HostColor::NoColor).to_string(), "none");
    }

    // 0.0255 * 100 * 100 在双精度下略小于 255，向下取整得到 254。
    #[test]
    fn cmyk_uses_floor_formula() {
        let mut colors = ColorNormalizer::default();
        let white = colors.normalize(&HostColor::Cmyk {
            cyan: 0.0,
            magenta: 0.0,
            yellow: 0.0,
            black: 0.0,
        });
        assert_eq!(white.to_string(), "rgb(254,254,254)");

        let cyan = colors.normalize(&HostColor::Cmyk {
            cyan: 100.0,
            magenta: 0.0,
            yellow: 0.0,
            black: 0.0,
        });
        assert_eq!(cyan.to_string(), "rgb(0,254,254)");

        let black = colors.normalize(&HostColor::Cmyk {
            cyan: 0.0,
            magenta: 0.0,
            yellow: 0.0,
            black: 100.0,
        });
        assert_eq!(black.to_string(), "rgb(0,0,0)");
    }

    #[test]
    fn unsupported_model_warns_once_per_run() {
        let mut colors = ColorNormalizer::new(true);
        assert_eq!(colors.normalize(&other("PatternColor")), FALLBACK_COLOR);
        assert_eq!(colors.normalize(&other("GradientColor")), FALLBACK_COLOR);
        assert_eq!(
            colors.diagnostics(),
            ["hanpuku does not yet support PatternColor".to_string()]
        );

        let mut next_run = ColorNormalizer::new(true);
        next_run.normalize(&other("SpotColor"));
        assert_eq!(next_run.take_diagnostics().len(), 1);
        assert!(next_run.diagnostics().is_empty());
    }

    #[test]
    fn disabled_warning_stays_silent() {
        let mut colors = ColorNormalizer::new(false);
        assert_eq!(
            colors.normalize(&other("PatternColor")).to_string(),
            "rgb(0,0,0)"
        );
        assert!(colors.diagnostics().is_empty());
    }
}
