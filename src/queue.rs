/// Caller-owned FIFO of read requests waiting for a touch report.
///
/// The queue belongs to the host's I/O subsystem. The driver only retrieves the
/// oldest pending request, borrows its output buffer and completes it. At most
/// one request is completed per acquisition event, and an event arriving while
/// the queue is empty is dropped rather than buffered.
pub trait RequestQueue {
  /// Handle to one pending request.
  type Request;
  /// Failure reported while retrieving a request's output buffer.
  type Error: core::fmt::Debug;

  /// Dequeue the oldest pending request, if any.
  fn retrieve_next(&mut self) -> Option<Self::Request>;

  /// Borrow the request's output buffer, which must hold at least `min_len`
  /// bytes.
  fn output_buffer<'r>(&mut self, request: &'r mut Self::Request, min_len: usize) -> Result<&'r mut [u8], Self::Error>;

  /// Hand the request back to its owner with the final status and the number
  /// of bytes written into its buffer.
  fn complete(&mut self, request: Self::Request, status: Result<(), Self::Error>, bytes_written: usize);
}
