pub mod draw_controls;
pub mod help_overlay;
pub mod map_view;
pub mod popups;
pub mod toolbar;
