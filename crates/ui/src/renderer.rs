use egui::{Align2, Color32, CornerRadius, FontId, Pos2, Rect, Stroke, StrokeKind};
use flame_chart_protocol::{self as protocol, RenderCommand, TextAlign};

/// Transform state for PushTransform/PopTransform.
#[derive(Debug, Clone, Copy)]
struct Transform {
    tx: f64,
    ty: f64,
    sx: f64,
    sy: f64,
}

impl Transform {
    fn identity() -> Self {
        Self {
            tx: 0.0,
            ty: 0.0,
            sx: 1.0,
            sy: 1.0,
        }
    }

    fn apply_x(&self, x: f64) -> f32 {
        (x * self.sx + self.tx) as f32
    }

    fn apply_y(&self, y: f64) -> f32 {
        (y * self.sy + self.ty) as f32
    }

    fn scale_w(&self, w: f64) -> f32 {
        (w * self.sx) as f32
    }

    fn scale_h(&self, h: f64) -> f32 {
        (h * self.sy) as f32
    }

    fn rect(&self, rect: &protocol::Rect, offset: Pos2) -> Rect {
        Rect::from_min_size(
            Pos2::new(self.apply_x(rect.x) + offset.x, self.apply_y(rect.y) + offset.y),
            egui::vec2(self.scale_w(rect.w), self.scale_h(rect.h)),
        )
    }

    fn point(&self, point: &protocol::Point, offset: Pos2) -> Pos2 {
        Pos2::new(
            self.apply_x(point.x) + offset.x,
            self.apply_y(point.y) + offset.y,
        )
    }
}

pub fn color32(color: protocol::Color) -> Color32 {
    let [r, g, b, a] = color.to_rgba8();
    Color32::from_rgba_unmultiplied(r, g, b, a)
}

/// Replay a recorded command list into an egui `Painter`.
///
/// `offset` is the top-left pixel position of the rendering area. Returns
/// the number of paint commands that survived culling.
pub fn render_commands(painter: &mut egui::Painter, commands: &[RenderCommand], offset: Pos2) -> usize {
    let mut transform_stack: Vec<Transform> = vec![Transform::identity()];
    let mut clip_stack: Vec<Rect> = Vec::new();
    let mut painted = 0;

    for cmd in commands {
        let tf = transform_stack
            .last()
            .copied()
            .unwrap_or(Transform::identity());
        match cmd {
            RenderCommand::FillRect { rect, color } => {
                let egui_rect = tf.rect(rect, offset);
                if egui_rect.width() <= 0.0 || egui_rect.height() <= 0.0 {
                    continue;
                }
                if !painter.clip_rect().intersects(egui_rect) {
                    continue;
                }
                painter.rect_filled(egui_rect, CornerRadius::ZERO, color32(*color));
                painted += 1;
            }

            RenderCommand::StrokeRect { rect, color, width } => {
                let egui_rect = tf.rect(rect, offset);
                if !painter.clip_rect().intersects(egui_rect.expand(*width as f32)) {
                    continue;
                }
                painter.rect_stroke(
                    egui_rect,
                    CornerRadius::ZERO,
                    Stroke::new(tf.scale_w(*width), color32(*color)),
                    StrokeKind::Middle,
                );
                painted += 1;
            }

            RenderCommand::DrawText {
                position,
                text,
                color,
                font_size,
                align,
            } => {
                let size = tf.scale_h(*font_size);
                if size < 1.0 || text.is_empty() {
                    continue;
                }
                let anchor = match align {
                    TextAlign::Left => Align2::LEFT_CENTER,
                    TextAlign::Center => Align2::CENTER_CENTER,
                    TextAlign::Right => Align2::RIGHT_CENTER,
                };
                painter.text(
                    tf.point(position, offset),
                    anchor,
                    text.as_str(),
                    FontId::proportional(size),
                    color32(*color),
                );
                painted += 1;
            }

            RenderCommand::DrawLine {
                from,
                to,
                color,
                width,
            } => {
                painter.line_segment(
                    [tf.point(from, offset), tf.point(to, offset)],
                    Stroke::new(tf.scale_w(*width), color32(*color)),
                );
                painted += 1;
            }

            RenderCommand::SetClip { rect } => {
                let clip_rect = tf.rect(rect, offset);
                clip_stack.push(painter.clip_rect());
                let intersected = painter.clip_rect().intersect(clip_rect);
                painter.set_clip_rect(intersected);
            }

            RenderCommand::ClearClip => {
                if let Some(prev) = clip_stack.pop() {
                    painter.set_clip_rect(prev);
                }
            }

            RenderCommand::PushTransform { translate, scale } => {
                let parent = tf;
                transform_stack.push(Transform {
                    tx: parent.tx + translate.x * parent.sx,
                    ty: parent.ty + translate.y * parent.sy,
                    sx: parent.sx * scale.x,
                    sy: parent.sy * scale.y,
                });
            }

            RenderCommand::PopTransform => {
                if transform_stack.len() > 1 {
                    transform_stack.pop();
                }
            }

            RenderCommand::BeginGroup { .. } | RenderCommand::EndGroup => {
                // groups carry no paint of their own
            }
        }
    }

    // an unbalanced list must not leak its clip into the caller's painter
    if let Some(first) = clip_stack.first() {
        painter.set_clip_rect(*first);
    }

    painted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors_are_not_premultiplied_twice() {
        let c = color32(protocol::Color::rgba8(200, 100, 50, 255));
        assert_eq!(c, Color32::from_rgb(200, 100, 50));
    }

    #[test]
    fn nested_transforms_compose() {
        let parent = Transform {
            tx: 10.0,
            ty: 20.0,
            sx: 2.0,
            sy: 2.0,
        };
        let child = Transform {
            tx: parent.tx + 5.0 * parent.sx,
            ty: parent.ty + 5.0 * parent.sy,
            sx: parent.sx,
            sy: parent.sy,
        };
        let rect = child.rect(&protocol::Rect::new(1.0, 1.0, 3.0, 4.0), Pos2::ZERO);
        assert_eq!(rect.min, Pos2::new(22.0, 32.0));
        assert_eq!(rect.size(), egui::vec2(6.0, 8.0));
    }
}
