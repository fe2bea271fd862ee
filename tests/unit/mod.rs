mod target_resolution;
