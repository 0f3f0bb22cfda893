use icewatch_shared::colors::hex_to_rgb;
use icewatch_shared::layers::CircleStyle;

/// Format RGBA as a CSS color string.
pub fn rgba_css(r: u8, g: u8, b: u8, a: f64) -> String {
    format!("rgba({r},{g},{b},{a})")
}

/// Canvas fill for a circle layer, with the layer opacity folded into alpha.
pub fn circle_fill(style: &CircleStyle) -> String {
    let (r, g, b) = hex_to_rgb(style.color).unwrap_or((255, 255, 255));
    rgba_css(r, g, b, style.opacity.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use icewatch_shared::layers::IceLayer;

    #[test]
    fn layer_fills_carry_opacity() {
        assert_eq!(
            circle_fill(&IceLayer::Historical.style()),
            "rgba(255,75,75,0.7)"
        );
        assert_eq!(
            circle_fill(&IceLayer::Predicted.style()),
            "rgba(75,215,255,0.9)"
        );
    }
}
