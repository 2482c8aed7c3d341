pub mod spacemouse;
