pub mod header;
pub mod help_overlay;
pub mod log_panel;
pub mod settings;
pub mod station_list;
pub mod visualizer_panel;
