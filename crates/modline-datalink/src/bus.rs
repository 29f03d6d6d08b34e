//! The transaction engine: one stop-and-wait exchange at a time per bus.

use std::time::Duration;

use modline_core::encoding::{Reader, Writer};
use modline_core::frame::Mode;
use modline_core::pdu::{ExceptionCode, ExceptionResponse, FunctionCode, Request};
use modline_core::MAX_PDU_LEN;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::trace;

use crate::{BusError, SerialPort};

/// Requests to this address are transmitted without expecting a response.
pub const BROADCAST_ADDRESS: u8 = 0;

/// Worst-case frame size (an ASCII frame carrying a full PDU).
const MAX_FRAME_LEN: usize = 2 * (MAX_PDU_LEN + 1) + 5;

/// Minimum inter-frame silence: 3.5 character times of 11 bits each, with
/// the 1.75 ms floor the standard prescribes for baud rates above 19200.
pub fn silent_interval(baud_rate: u32) -> Duration {
    const FLOOR: Duration = Duration::from_micros(1750);
    let character_times = 3.5 * 11.0 / f64::from(baud_rate.max(1));
    Duration::from_secs_f64(character_times).max(FLOOR)
}

/// Per-exchange knobs. An [`crate::SerialPort`] carries the line parameters;
/// these govern how one transaction is sequenced on top of it.
#[derive(Debug, Clone, Copy)]
pub struct TransactOptions {
    pub response_timeout: Duration,
    /// Clear both port buffers before transmitting, so stale bytes from an
    /// aborted exchange cannot shift frame alignment.
    pub clear_buffers_before_transaction: bool,
    /// The RS-485 adaptor loops transmitted bytes back; read and verify one
    /// request-length prefix before reading the response.
    pub handle_local_echo: bool,
    /// Open the port before the exchange and close it on every exit path.
    pub close_port_after_call: bool,
    /// Compatibility knob for slaves that append a stray byte to read
    /// responses: drain at most one extra byte after a successful fc 3/4
    /// exchange.
    pub drain_quirk_trailing_byte: bool,
}

impl Default for TransactOptions {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_millis(50),
            clear_buffers_before_transaction: true,
            handle_local_echo: false,
            close_port_after_call: false,
            drain_quirk_trailing_byte: false,
        }
    }
}

impl TransactOptions {
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn with_local_echo(mut self, handle_local_echo: bool) -> Self {
        self.handle_local_echo = handle_local_echo;
        self
    }

    pub fn with_close_port_after_call(mut self, close_port_after_call: bool) -> Self {
        self.close_port_after_call = close_port_after_call;
        self
    }
}

struct BusState<P> {
    port: P,
    last_activity: Option<Instant>,
}

/// One shared serial bus. The internal mutex is the serialisation point: a
/// transaction holds it from the silent-interval wait until the response is
/// parsed, so there is never more than one outstanding request per bus.
pub struct Bus<P: SerialPort> {
    state: Mutex<BusState<P>>,
}

impl<P: SerialPort> Bus<P> {
    pub fn new(port: P) -> Self {
        Self {
            state: Mutex::new(BusState {
                port,
                last_activity: None,
            }),
        }
    }

    /// Execute one complete exchange and return the response PDU.
    ///
    /// Broadcast requests return an empty PDU immediately after
    /// transmission.
    pub async fn transact(
        &self,
        slave: u8,
        mode: Mode,
        request: &Request<'_>,
        opts: &TransactOptions,
    ) -> Result<Vec<u8>, BusError> {
        let mut pdu_buf = [0u8; MAX_PDU_LEN];
        let mut pdu_writer = Writer::new(&mut pdu_buf);
        request.encode(&mut pdu_writer)?;

        let mut frame_buf = [0u8; MAX_FRAME_LEN];
        let mut frame_writer = Writer::new(&mut frame_buf);
        mode.encode_frame(&mut frame_writer, slave, pdu_writer.as_written())?;
        let request_frame = frame_writer.as_written();

        let expected_len = if slave == BROADCAST_ADDRESS {
            0
        } else {
            mode.frame_len(request.response_pdu_len())
        };

        let mut state = self.state.lock().await;
        if !state.port.is_open() {
            state.port.open().await?;
        }

        let result = state
            .exchange(
                slave,
                mode,
                request.function_code(),
                request_frame,
                expected_len,
                opts,
            )
            .await;

        if opts.close_port_after_call {
            match state.port.close().await {
                Ok(()) => result,
                Err(err) => result.and(Err(BusError::Transport(err))),
            }
        } else {
            result
        }
    }
}

impl<P: SerialPort> BusState<P> {
    async fn exchange(
        &mut self,
        slave: u8,
        mode: Mode,
        function: FunctionCode,
        request_frame: &[u8],
        expected_len: usize,
        opts: &TransactOptions,
    ) -> Result<Vec<u8>, BusError> {
        let minimum = silent_interval(self.port.baud_rate());
        if let Some(last) = self.last_activity {
            let elapsed = last.elapsed();
            if elapsed < minimum {
                trace!(?elapsed, ?minimum, "waiting out inter-frame silence");
                sleep(minimum - elapsed).await;
            }
        }

        if opts.clear_buffers_before_transaction {
            self.port.clear_input().await?;
            self.port.clear_output().await?;
        }

        trace!(slave, frame_len = request_frame.len(), "sending request frame");
        self.port.write_all(request_frame).await?;
        self.last_activity = Some(Instant::now());

        if slave == BROADCAST_ADDRESS {
            return Ok(Vec::new());
        }

        if opts.handle_local_echo {
            let mut echo = [0u8; MAX_FRAME_LEN];
            let n = self
                .port
                .read(&mut echo[..request_frame.len()], opts.response_timeout)
                .await?;
            self.last_activity = Some(Instant::now());
            if &echo[..n] != request_frame {
                return Err(BusError::LocalEchoMismatch);
            }
            trace!(bytes = n, "discarded local echo");
        }

        let mut response = vec![0u8; expected_len];
        let received = self
            .port
            .read(&mut response, opts.response_timeout)
            .await?;
        self.last_activity = Some(Instant::now());
        trace!(slave, expected = expected_len, received, "read response");

        if received == 0 {
            return Err(BusError::NoResponse { slave });
        }
        if received < expected_len {
            // A slave exception is always shorter than the predicted
            // happy-path response, so probe for one before reporting the
            // truncation itself.
            if let Some(err) = exception_in(mode, &response[..received], slave) {
                return Err(err);
            }
            return Err(BusError::ShortResponse {
                slave,
                expected: expected_len,
                received,
            });
        }

        let mut scratch = [0u8; MAX_PDU_LEN + 2];
        let (address, pdu) = mode.decode_frame(&response, &mut scratch)?;
        if address != slave {
            return Err(BusError::InvalidResponse("slave address mismatch"));
        }
        if pdu.is_empty() {
            return Err(BusError::InvalidResponse("empty response pdu"));
        }
        if FunctionCode::is_exception(pdu[0]) {
            let ex = ExceptionResponse::decode(&mut Reader::new(pdu))?;
            return Err(BusError::SlaveException {
                slave,
                function: ex.function_code,
                code: ex.exception_code,
            });
        }
        if pdu[0] != function.as_u8() {
            return Err(BusError::InvalidResponse("function code mismatch"));
        }

        let pdu = pdu.to_vec();

        if opts.drain_quirk_trailing_byte
            && matches!(
                function,
                FunctionCode::ReadHoldingRegisters | FunctionCode::ReadInputRegisters
            )
        {
            let mut extra = [0u8; 1];
            if let Ok(n) = self.port.read(&mut extra, minimum).await {
                if n > 0 {
                    trace!(byte = extra[0], "drained trailing quirk byte");
                    self.last_activity = Some(Instant::now());
                }
            }
        }

        Ok(pdu)
    }
}

/// Check whether a short read is a well-formed exception frame from the
/// addressed slave.
fn exception_in(mode: Mode, bytes: &[u8], slave: u8) -> Option<BusError> {
    if bytes.len() != mode.exception_frame_len() {
        return None;
    }
    let mut scratch = [0u8; 8];
    let (address, pdu) = mode.decode_frame(bytes, &mut scratch).ok()?;
    if address != slave || pdu.len() != 2 || !FunctionCode::is_exception(pdu[0]) {
        return None;
    }
    Some(BusError::SlaveException {
        slave,
        function: pdu[0] & 0x7F,
        code: ExceptionCode::from_u8(pdu[1]),
    })
}

#[cfg(test)]
mod tests {
    use super::{exception_in, silent_interval};
    use crate::BusError;
    use modline_core::frame::Mode;
    use modline_core::pdu::ExceptionCode;
    use std::time::Duration;

    #[test]
    fn silent_interval_tracks_baud_rate() {
        // 3.5 character times of 11 bits at 19200 baud is a hair over 2 ms.
        assert_eq!(silent_interval(19200), Duration::from_secs_f64(38.5 / 19200.0));
        assert_eq!(silent_interval(2400), Duration::from_secs_f64(38.5 / 2400.0));
    }

    #[test]
    fn silent_interval_floor_applies_at_high_baud() {
        assert_eq!(silent_interval(38400), Duration::from_micros(1750));
        assert_eq!(silent_interval(115_200), Duration::from_micros(1750));
    }

    #[test]
    fn short_read_exception_probe() {
        let frame = [0x01, 0x83, 0x02, 0xC0, 0xF1];
        match exception_in(Mode::Rtu, &frame, 0x01) {
            Some(BusError::SlaveException { function, code, .. }) => {
                assert_eq!(function, 0x03);
                assert_eq!(code, ExceptionCode::IllegalDataAddress);
            }
            other => panic!("unexpected probe result: {other:?}"),
        }

        // Wrong slave address is not our exception.
        assert!(exception_in(Mode::Rtu, &frame, 0x02).is_none());
        // Truncated garbage is not an exception frame.
        assert!(exception_in(Mode::Rtu, &frame[..4], 0x01).is_none());
    }
}
