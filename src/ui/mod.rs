/// Presentation: egui panels around the request flow and the chart renderer.
pub mod panels;
pub mod plot;
