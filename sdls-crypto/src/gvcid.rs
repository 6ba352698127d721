/// Global Virtual Channel Identifier: the (transfer-frame-version, spacecraft,
/// virtual-channel, MAP) tuple that selects a Managed Parameter entry and,
/// through it, the Security Association to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Gvcid {
    pub tfvn: u8,
    pub scid: u16,
    pub vcid: u8,
    pub mapid: Option<u8>,
}

impl Gvcid {
    pub fn new(tfvn: u8, scid: u16, vcid: u8, mapid: Option<u8>) -> Self {
        Gvcid {
            tfvn,
            scid,
            vcid,
            mapid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_nothing() {
        let a = Gvcid::new(0, 0x3FF, 1, None);
        let b = Gvcid::new(0, 0x3FF, 1, Some(0));
        assert_ne!(a, b);
    }
}
