macro_rules! bit {
    ($bit_num:expr) => {
        (1 << $bit_num) as u8
    };
}
