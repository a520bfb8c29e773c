use std::time::Duration;

use framemux_dispatch::{SenderConfig, StopAndWaitSender};
use framemux_frame::HEADER_SIZE;
use framemux_transport::{StreamConfig, StreamTransport, UnixDomainSocket};

use crate::cmd::SendArgs;
use crate::exit::{send_error, transport_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{print_reply, OutputFormat};
use crate::FRAME_LEN;

const POLL_INTERVAL: Duration = Duration::from_millis(2);

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let payload = resolve_payload(&args)?;

    let stream =
        UnixDomainSocket::connect(&args.path).map_err(|err| transport_error("connect failed", err))?;
    let transport = StreamTransport::<_, FRAME_LEN>::with_config(
        stream,
        &StreamConfig {
            read_timeout: Some(timeout),
            write_timeout: Some(timeout),
        },
    )
    .map_err(|err| transport_error("socket setup failed", err))?;

    let mut sender = StopAndWaitSender::with_config(transport, sender_config(timeout, args.attempts));
    let reply = if args.reliable {
        sender.send_reliable(args.id, &payload)
    } else {
        sender.send_unreliable(args.id, &payload)
    }
    .map_err(|err| send_error("send failed", err))?;

    print_reply(&reply, format);
    Ok(SUCCESS)
}

/// Split the overall timeout evenly across the transmissions.
fn sender_config(timeout: Duration, attempts: u32) -> SenderConfig {
    let attempts = attempts.max(1);
    SenderConfig {
        retransmit_after: timeout / attempts,
        max_attempts: attempts,
        poll_interval: POLL_INTERVAL,
    }
}

fn resolve_payload(args: &SendArgs) -> CliResult<Vec<u8>> {
    let payload = match (&args.data, &args.hex) {
        (Some(data), _) => data.as_bytes().to_vec(),
        (None, Some(hex)) => parse_hex(hex)?,
        (None, None) => Vec::new(),
    };
    let max = FRAME_LEN - HEADER_SIZE;
    if payload.len() > max {
        return Err(CliError::new(
            DATA_INVALID,
            format!("payload is {} bytes, frame holds {max}", payload.len()),
        ));
    }
    Ok(payload)
}

fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let digits: Vec<u8> = input
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if digits.len() % 2 != 0 {
        return Err(CliError::new(USAGE, "--hex needs an even number of digits"));
    }
    digits
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|text| u8::from_str_radix(text, 16).ok())
                .ok_or_else(|| CliError::new(USAGE, format!("--hex is not valid hex: {input}")))
        })
        .collect()
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = match input.strip_suffix("ms") {
        Some(number) => (number, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };
    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
