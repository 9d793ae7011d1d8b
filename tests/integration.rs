use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use assert_cmd::cargo::cargo_bin;
use duct::cmd;

struct ServerProcess {
    child: std::process::Child,
    addr: String,
}

impl ServerProcess {
    fn start() -> Self {
        let mut child = std::process::Command::new(cargo_bin("wireline"))
            .arg("serve")
            .arg("127.0.0.1:0")
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .spawn()
            .expect("failed to start wireline binary");

        // the server prints its bound address once it is listening
        let stdout = child.stdout.take().expect("stdout piped");
        let mut lines = BufReader::new(stdout).lines();
        let addr = lines
            .next()
            .expect("server printed its address")
            .expect("readable stdout");

        ServerProcess { child, addr }
    }

    fn exchange(&self, wire: &[u8]) -> String {
        let mut stream = TcpStream::connect(&self.addr).expect("connect to server");
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        stream.write_all(wire).unwrap();
        stream.shutdown(std::net::Shutdown::Write).unwrap();

        let mut reply = Vec::new();
        stream.read_to_end(&mut reply).unwrap();
        String::from_utf8_lossy(&reply).into_owned()
    }
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[test]
fn test_integration() {
    let server = ServerProcess::start();

    // plain route
    let reply =
        server.exchange(b"GET /hello HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    assert!(reply.starts_with("HTTP/1.1 200 OK\r\n"), "got: {reply}");
    assert!(reply.contains("Content-Type: text/plain\r\n"));
    assert!(reply.ends_with("Hello, world!\n"));

    // parameterized route returns JSON
    let reply = server.exchange(b"GET /echo/ping HTTP/1.1\r\nConnection: close\r\n\r\n");
    assert!(reply.starts_with("HTTP/1.1 200 OK\r\n"), "got: {reply}");
    assert!(reply.contains("Content-Type: application/json\r\n"));
    let body = reply.split("\r\n\r\n").nth(1).expect("body present");
    let json: serde_json::Value = serde_json::from_str(body).expect("json body");
    assert_eq!(json["message"], "ping");
    assert_eq!(json["via"], "wireline");

    // unknown path
    let reply = server.exchange(b"GET /nope HTTP/1.1\r\nConnection: close\r\n\r\n");
    assert!(reply.starts_with("HTTP/1.1 404 Not Found\r\n"), "got: {reply}");

    // framing violation
    let reply = server.exchange(b"GET /hello HTTP/1.0\r\n\r\n");
    assert!(
        reply.starts_with("HTTP/1.1 505 HTTP Version Not Supported\r\n"),
        "got: {reply}"
    );

    // the bundled client against the same server
    let output = cmd!(cargo_bin("wireline"), "get", &server.addr, "/hello")
        .read()
        .expect("client run");
    assert_eq!(output, "Hello, world!");
}
