//! In-memory representation of a standard-format CAN frame as exchanged
//! with the controller adapter.
use embedded_can::StandardId;

#[derive(Clone, Debug)]
/// One classic CAN frame. Always standard format (11-bit identifier).
pub struct CanFrame {
    /// 11-bit identifier.
    pub id: StandardId,
    /// Payload buffer; only the first `dlc` bytes are valid.
    pub data: [u8; 8],
    /// Data length code (0 to 8 for ISO 11898-1 traffic).
    pub dlc: usize,
    /// Remote transmission request.
    pub rtr: bool,
    /// Echo the transmitted frame into the controller's own receive path.
    pub self_reception: bool,
    /// Do not retransmit on arbitration loss or error.
    pub single_shot: bool,
    /// Set by hardware on receive when the frame carried a DLC above 8.
    /// Such frames are representable but rejected by the driver.
    pub dlc_non_comp: bool,
}

impl CanFrame {
    /// Build a data frame for normal transmission: rtr, self-reception, and
    /// single-shot all clear. `payload` must hold at most 8 bytes; the
    /// caller validates before construction.
    pub fn data_frame(id: StandardId, payload: &[u8]) -> Self {
        let mut data = [0u8; 8];
        data[..payload.len()].copy_from_slice(payload);
        Self {
            id,
            data,
            dlc: payload.len(),
            rtr: false,
            self_reception: false,
            single_shot: false,
            dlc_non_comp: false,
        }
    }

    /// Valid payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.dlc.min(8)]
    }
}
